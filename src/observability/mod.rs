//! Observability: logging setup and crash context.
//!
//! Logs go to stderr through `tracing`, so stdout only ever carries the
//! report. The filter comes from `TENANTGUARD_LOG` when set, otherwise from
//! the `-v` count:
//!
//! ```text
//! TENANTGUARD_LOG=tenantguard::schema=debug tenantguard check facts/
//! ```
//!
//! Track context during analysis:
//!
//! ```ignore
//! use tenantguard::observability::{set_phase, set_current_unit, AnalysisPhase};
//!
//! let _phase = set_phase(AnalysisPhase::HandlerAnalysis);
//! for unit in &units {
//!     let _unit = set_current_unit(&unit.origin);
//!     // a panic here reports the phase and document
//! }
//! ```

pub mod context;
pub mod panic_hook;

pub use context::{
    get_current_context, get_progress, increment_processed, set_current_handler,
    set_current_unit, set_phase, set_progress, AnalysisContext, AnalysisPhase, ContextGuard,
};
pub use panic_hook::install_panic_hook;

use tracing_subscriber::EnvFilter;

pub const LOG_ENV_VAR: &str = "TENANTGUARD_LOG";

/// Default filter directive for a `-v` count.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Initialize the global subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init_tracing(verbosity: u8) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbosity > 1)
        .try_init();
}
