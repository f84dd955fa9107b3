//! CLI command implementations.
//!
//! - **check**: run the full analysis and write the report
//! - **schema**: classify the schema only and print the entity table
//! - **init**: write a default `.tenantguard.toml`
//!
//! Every handler returns the [`ExitStatus`] the process should end with;
//! errors that escape a handler end the process with [`ExitStatus::Fatal`].

pub mod check;
pub mod init;
pub mod schema;

pub use check::{handle_check, CheckConfig};
pub use init::{init_config, DEFAULT_CONFIG};
pub use schema::{handle_schema, SchemaCommandConfig};

use crate::config::{load_config, TenantGuardConfig};
use anyhow::Result;
use std::path::Path;

/// Resolve configuration for a run over `path`. Discovery starts at `path`
/// itself when it is a directory, otherwise at its parent.
pub fn load_run_config(path: &Path, explicit: Option<&Path>) -> Result<TenantGuardConfig> {
    let start = if path.is_dir() {
        path
    } else {
        path.parent().unwrap_or(Path::new("."))
    };

    load_config(explicit, start).map_err(|errors| {
        let details = errors
            .iter()
            .map(|e| format!("  [{}] {}", e.code(), e))
            .collect::<Vec<_>>()
            .join("\n");
        anyhow::anyhow!("invalid configuration ({} error(s)):\n{}", errors.len(), details)
    })
}
