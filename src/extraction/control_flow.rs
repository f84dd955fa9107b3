//! Control-flow reduction.
//!
//! Branching is not simulated. The parser reports the paths around an
//! operation, and the analysis keeps only the paths that both build and
//! execute it. A predicate requirement then has to hold on every one of
//! those paths, which is a conservative join over branches.

use super::Predicate;
use crate::config::ScanLimits;
use crate::errors::ExtractionError;
use crate::facts::{Conjunction, ControlFlowSummary};

/// Branch labels of the paths that build and execute the operation, in
/// the order the parser reported them. An empty summary is one unlabelled
/// straight-line path.
pub fn execution_paths(summary: &ControlFlowSummary) -> Vec<Option<String>> {
    if summary.paths.is_empty() {
        return vec![None];
    }
    let mut paths: Vec<Option<String>> = Vec::new();
    for path in summary
        .paths
        .iter()
        .filter(|p| p.builds && p.executes)
    {
        if !paths.contains(&path.branch) {
            paths.push(path.branch.clone());
        }
    }
    paths
}

/// Reject control-flow summaries beyond the configured scan caps.
pub fn check_limits(summary: &ControlFlowSummary, limits: &ScanLimits) -> Result<(), ExtractionError> {
    if summary.paths.len() > limits.max_paths_per_operation {
        return Err(ExtractionError::ScanCapExceeded {
            limit: "max_paths_per_operation",
            value: summary.paths.len(),
            max: limits.max_paths_per_operation,
        });
    }
    if summary.nesting_depth > limits.max_nesting_depth {
        return Err(ExtractionError::ScanCapExceeded {
            limit: "max_nesting_depth",
            value: summary.nesting_depth as usize,
            max: limits.max_nesting_depth as usize,
        });
    }
    Ok(())
}

/// True when, on every execution path, the predicates active on that path
/// are all AND-joined and at least one of them satisfies `required`.
///
/// An empty path list is never covered.
pub fn covers_every_path<F>(paths: &[Option<String>], predicates: &[Predicate], required: F) -> bool
where
    F: Fn(&Predicate) -> bool,
{
    !paths.is_empty()
        && paths.iter().all(|path| {
            let active: Vec<&Predicate> = predicates
                .iter()
                .filter(|p| p.active_on(path.as_deref()))
                .collect();
            active.iter().all(|p| p.conjunction == Conjunction::And)
                && active.iter().any(|p| required(p))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{Comparison, RhsSource};
    use crate::facts::PathFact;

    fn scoped(branch: Option<&str>) -> Predicate {
        Predicate {
            entity: "Project".into(),
            column: "workspace_id".into(),
            comparison: Comparison::Equals,
            rhs_source: RhsSource::TenantContextValue,
            conjunction: Conjunction::And,
            branch: branch.map(String::from),
        }
    }

    fn is_scoped(p: &Predicate) -> bool {
        p.column == "workspace_id" && p.rhs_source == RhsSource::TenantContextValue
    }

    fn summary(paths: &[(Option<&str>, bool, bool)]) -> ControlFlowSummary {
        ControlFlowSummary {
            paths: paths
                .iter()
                .map(|(branch, builds, executes)| PathFact {
                    branch: branch.map(String::from),
                    builds: *builds,
                    executes: *executes,
                })
                .collect(),
            nesting_depth: 1,
        }
    }

    #[test]
    fn test_empty_summary_is_one_straight_path() {
        assert_eq!(execution_paths(&ControlFlowSummary::default()), vec![None]);
    }

    #[test]
    fn test_only_building_and_executing_paths_count() {
        let cf = summary(&[
            (Some("then"), true, true),
            (Some("else"), true, false),
            (Some("dead"), false, true),
        ]);
        assert_eq!(execution_paths(&cf), vec![Some("then".to_string())]);

        let never = summary(&[(None, true, false)]);
        assert!(execution_paths(&never).is_empty());
    }

    #[test]
    fn test_branch_only_filter_does_not_cover_all_paths() {
        let paths = vec![Some("then".to_string()), Some("else".to_string())];
        let predicates = vec![scoped(Some("then"))];
        assert!(!covers_every_path(&paths, &predicates, is_scoped));

        let both = vec![scoped(Some("then")), scoped(Some("else"))];
        assert!(covers_every_path(&paths, &both, is_scoped));

        let unbranched = vec![scoped(None)];
        assert!(covers_every_path(&paths, &unbranched, is_scoped));
    }

    #[test]
    fn test_or_joined_predicate_breaks_coverage() {
        let mut alternative = scoped(None);
        alternative.column = "id".into();
        alternative.conjunction = Conjunction::Or;
        let predicates = vec![scoped(None), alternative];

        assert!(!covers_every_path(&[None], &predicates, is_scoped));
    }

    #[test]
    fn test_scan_caps() {
        let limits = ScanLimits {
            max_paths_per_operation: 1,
            max_nesting_depth: 4,
            max_operations_per_handler: 10,
        };
        let cf = summary(&[(Some("a"), true, true), (Some("b"), true, true)]);
        assert!(matches!(
            check_limits(&cf, &limits),
            Err(ExtractionError::ScanCapExceeded {
                limit: "max_paths_per_operation",
                ..
            })
        ));

        let deep = ControlFlowSummary {
            paths: vec![],
            nesting_depth: 9,
        };
        assert!(matches!(
            check_limits(&deep, &limits),
            Err(ExtractionError::ScanCapExceeded {
                limit: "max_nesting_depth",
                ..
            })
        ));
    }
}
