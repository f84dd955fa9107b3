//! Run orchestration.
//!
//! A run has three stages:
//!
//! 1. Load fact documents ([`load_units`]), in parallel.
//! 2. Merge every unit's schema facts and classify them once. The classified
//!    schema is published behind an [`Arc`] and never mutated afterwards.
//! 3. Extract and evaluate the handlers of every unit in parallel, then hand
//!    all findings to the [`ReportAggregator`], which sorts them.
//!
//! Nothing in stage 3 depends on completion order: rayon's indexed collect
//! keeps results in unit order and the aggregator re-sorts by location.

use crate::config::TenantGuardConfig;
use crate::errors::collection::{AnalysisFailure, BatchResults};
use crate::errors::{AnalysisError, EvaluationError, SchemaError};
use crate::extraction::{AccessPointExtractor, HandlerError};
use crate::facts::loader::{self, SourceUnit};
use crate::facts::{HandlerFact, SchemaFact};
use crate::isolation::evaluate;
use crate::observability::{
    increment_processed, set_current_handler, set_current_unit, set_phase, set_progress,
    AnalysisPhase,
};
use crate::report::{Finding, Report, ReportAggregator, SuppressionList};
use crate::schema::{classify, ClassifiedSchema};
use rayon::prelude::*;
use std::path::Path;
use std::sync::Arc;

/// Why a single handler produced no findings.
#[derive(Debug)]
enum HandlerFailure {
    Extraction(HandlerError),
    Evaluation(EvaluationError),
}

type HandlerOutcome = Result<Vec<Finding>, HandlerFailure>;

/// Load every fact document under `root`.
pub fn load_units(root: &Path, config: &TenantGuardConfig) -> BatchResults<SourceUnit> {
    let _phase = set_phase(AnalysisPhase::Loading);
    let results = loader::load_units(root, config.get_ignore_patterns());
    tracing::info!(
        root = %root.display(),
        loaded = results.success_count(),
        failed = results.failure_count(),
        "loaded fact documents"
    );
    results
}

/// Merge the schema facts of all units and classify them.
pub fn classify_units(
    units: &[SourceUnit],
    config: &TenantGuardConfig,
) -> Result<ClassifiedSchema, SchemaError> {
    let _phase = set_phase(AnalysisPhase::SchemaClassification);
    let facts: Vec<SchemaFact> = units
        .iter()
        .flat_map(|unit| unit.document.schema.iter().cloned())
        .collect();
    let schema = classify(&facts, &config.schema)?;
    tracing::info!(
        entities = schema.len(),
        tenant_scoped = schema.tenant_scoped().count(),
        "classified schema"
    );
    Ok(schema)
}

/// Load and analyze everything under `root` inside a pool of
/// `config.worker_count()` threads.
pub fn run(root: &Path, config: &TenantGuardConfig) -> Result<Report, AnalysisError> {
    with_worker_pool(config.worker_count(), || {
        let _span = tracing::info_span!("tenantguard.run", root = %root.display()).entered();
        let loaded = load_units(root, config);
        analyze(&loaded.successes, &loaded.failures, config)
    })
}

/// Analyze already-loaded units.
///
/// `failures` are documents that could not be loaded. In strict mode the
/// first one aborts the run; otherwise each becomes an `Unknown` finding.
pub fn analyze(
    units: &[SourceUnit],
    failures: &[AnalysisFailure],
    config: &TenantGuardConfig,
) -> Result<Report, AnalysisError> {
    let strict = config.analysis.strict;
    if strict {
        if let Some(failure) = failures.first() {
            return Err(AnalysisError::Load {
                path: failure.path.clone(),
                code: failure.code,
                message: failure.error.clone(),
            });
        }
    }

    let schema = Arc::new(classify_units(units, config)?);

    let mut ordered: Vec<&SourceUnit> = units.iter().collect();
    ordered.sort_by(|a, b| a.origin.cmp(&b.origin));
    let outcomes = analyze_handlers(&ordered, &schema, config);

    let _phase = set_phase(AnalysisPhase::Aggregation);
    let mut aggregator = ReportAggregator::new(
        config.analysis.include_safe,
        SuppressionList::from_config(&config.suppressions),
    );
    for failure in failures {
        tracing::warn!(
            path = %failure.path.display(),
            error = %failure.error,
            "fact document could not be loaded"
        );
        aggregator.push(Finding::unknown_unit(failure));
    }

    for outcome in outcomes {
        match outcome {
            Ok(findings) => aggregator.extend(findings),
            Err(HandlerFailure::Evaluation(e)) => return Err(AnalysisError::Evaluation(e)),
            Err(HandlerFailure::Extraction(e)) if strict => {
                return Err(AnalysisError::Extraction {
                    location: e.location.to_string(),
                    source: e.error,
                });
            }
            Err(HandlerFailure::Extraction(e)) => {
                tracing::warn!(location = %e.location, error = %e.error, "handler could not be analyzed");
                aggregator.push(Finding::unknown_handler(&e));
            }
        }
    }

    let report = aggregator.finish();
    tracing::info!(
        findings = report.findings.len(),
        violations = report.summary.violations(),
        analyzer_errors = report.summary.analyzer_errors,
        "analysis complete"
    );
    Ok(report)
}

/// Outcomes of every handler, in unit order then handler order.
fn analyze_handlers(
    units: &[&SourceUnit],
    schema: &Arc<ClassifiedSchema>,
    config: &TenantGuardConfig,
) -> Vec<HandlerOutcome> {
    let _phase = set_phase(AnalysisPhase::HandlerAnalysis);
    let extractor = AccessPointExtractor::new(schema, config);
    set_progress(0, units.len());

    let per_unit: Vec<Vec<HandlerOutcome>> = units
        .par_iter()
        .map(|unit| {
            // Rayon workers don't inherit the caller's thread-local phase.
            let _phase = set_phase(AnalysisPhase::HandlerAnalysis);
            let _unit = set_current_unit(&unit.origin);
            let _span = tracing::debug_span!("unit", origin = %unit.origin.display()).entered();
            let outcomes = unit
                .document
                .handlers
                .iter()
                .filter(|handler| {
                    let ignored = extractor.is_ignored(&handler.location);
                    if ignored {
                        tracing::debug!(location = %handler.location, "skipping ignored handler");
                    }
                    !ignored
                })
                .map(|handler| analyze_handler(&extractor, schema, handler))
                .collect();
            increment_processed();
            outcomes
        })
        .collect();

    per_unit.into_iter().flatten().collect()
}

fn analyze_handler(
    extractor: &AccessPointExtractor<'_>,
    schema: &ClassifiedSchema,
    handler: &HandlerFact,
) -> HandlerOutcome {
    let _handler = set_current_handler(&handler.location.handler);
    let points = extractor
        .extract_handler(handler)
        .map_err(HandlerFailure::Extraction)?;

    let mut findings = Vec::with_capacity(points.len());
    for point in &points {
        let verdict = evaluate(point, schema).map_err(HandlerFailure::Evaluation)?;
        match verdict {
            Some(verdict) => {
                tracing::trace!(
                    access_point = %point.id,
                    classification = %verdict.classification,
                    "evaluated access point"
                );
                findings.push(Finding::from_verdict(point, verdict));
            }
            None => {
                tracing::debug!(access_point = %point.id, "operation never executes; not reported")
            }
        }
    }
    Ok(findings)
}

/// Run `f` inside a dedicated rayon pool. Falls back to the global pool if
/// the dedicated one cannot be built.
pub fn with_worker_pool<T, F>(jobs: usize, f: F) -> T
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    match rayon::ThreadPoolBuilder::new().num_threads(jobs).build() {
        Ok(pool) => pool.install(f),
        Err(e) => {
            tracing::warn!(jobs, error = %e, "could not build worker pool, using the global pool");
            f()
        }
    }
}
