//! Thread-local context tracking for crash reports.
//!
//! Records which phase of the run, which fact document and which handler
//! the current thread is working on. Uses thread-local storage so it works
//! with rayon parallel iterators, and atomic counters for global progress.

use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

static UNITS_PROCESSED: AtomicUsize = AtomicUsize::new(0);
static UNITS_TOTAL: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static CURRENT_CONTEXT: RefCell<AnalysisContext> = const { RefCell::new(AnalysisContext::new()) };
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub phase: Option<AnalysisPhase>,
    /// Fact document currently being analyzed
    pub current_unit: Option<PathBuf>,
    /// Handler currently being extracted or evaluated
    pub current_handler: Option<String>,
}

impl AnalysisContext {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            phase: None,
            current_unit: None,
            current_handler: None,
        }
    }
}

/// Major stages of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    /// Walking and parsing fact documents
    Loading,
    /// Merging and classifying schema facts
    SchemaClassification,
    /// Extracting and evaluating access points
    HandlerAnalysis,
    /// Sorting, deduplicating and suppressing findings
    Aggregation,
    /// Writing the report
    OutputGeneration,
}

impl std::fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Loading => write!(f, "loading"),
            Self::SchemaClassification => write!(f, "schema_classification"),
            Self::HandlerAnalysis => write!(f, "handler_analysis"),
            Self::Aggregation => write!(f, "aggregation"),
            Self::OutputGeneration => write!(f, "output_generation"),
        }
    }
}

/// Restores the previous context on drop, so guards nest (handler within
/// unit within phase).
pub struct ContextGuard {
    previous: AnalysisContext,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        CURRENT_CONTEXT.with(|ctx| {
            *ctx.borrow_mut() = self.previous.clone();
        });
    }
}

fn update(apply: impl FnOnce(&mut AnalysisContext)) -> ContextGuard {
    CURRENT_CONTEXT.with(|ctx| {
        let previous = ctx.borrow().clone();
        apply(&mut *ctx.borrow_mut());
        ContextGuard { previous }
    })
}

/// Set the current analysis phase until the guard drops.
#[must_use]
pub fn set_phase(phase: AnalysisPhase) -> ContextGuard {
    update(|ctx| ctx.phase = Some(phase))
}

#[must_use]
pub fn set_current_unit(path: impl Into<PathBuf>) -> ContextGuard {
    let path = path.into();
    update(|ctx| ctx.current_unit = Some(path))
}

#[must_use]
pub fn set_current_handler(name: impl Into<String>) -> ContextGuard {
    let name = name.into();
    update(|ctx| ctx.current_handler = Some(name))
}

pub fn set_progress(processed: usize, total: usize) {
    UNITS_PROCESSED.store(processed, Ordering::Relaxed);
    UNITS_TOTAL.store(total, Ordering::Relaxed);
}

/// Thread-safe; called from parallel iterators.
pub fn increment_processed() {
    UNITS_PROCESSED.fetch_add(1, Ordering::Relaxed);
}

#[must_use]
pub fn get_current_context() -> AnalysisContext {
    CURRENT_CONTEXT.with(|ctx| ctx.borrow().clone())
}

/// (processed, total) fact documents.
#[must_use]
pub fn get_progress() -> (usize, usize) {
    (
        UNITS_PROCESSED.load(Ordering::Relaxed),
        UNITS_TOTAL.load(Ordering::Relaxed),
    )
}

pub fn reset_context() {
    CURRENT_CONTEXT.with(|ctx| {
        *ctx.borrow_mut() = AnalysisContext::new();
    });
}
