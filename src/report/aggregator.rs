//! Collects findings from all workers into one sorted report.
//!
//! Findings may arrive in any order. Ordering is always re-established by
//! sorting here, never by completion order.

use super::suppression::SuppressionList;
use super::{Finding, Report, Summary};
use crate::isolation::Classification;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub struct ReportAggregator {
    include_safe: bool,
    suppressions: SuppressionList,
    findings: Vec<Finding>,
}

impl ReportAggregator {
    pub fn new(include_safe: bool, suppressions: SuppressionList) -> Self {
        Self {
            include_safe,
            suppressions,
            findings: Vec::new(),
        }
    }

    pub fn push(&mut self, finding: Finding) {
        self.findings.push(finding);
    }

    pub fn extend(&mut self, findings: impl IntoIterator<Item = Finding>) {
        self.findings.extend(findings);
    }

    pub fn finish(self) -> Report {
        let Self {
            include_safe,
            suppressions,
            findings,
        } = self;
        let mut warnings = Vec::new();

        let mut findings = dedup(findings);

        let mut used = vec![false; suppressions.len()];
        for finding in &mut findings {
            if let Some(index) = suppressions.find(finding) {
                used[index] = true;
                finding.suppressed = true;
                finding.suppression_reason = suppressions.get(index).and_then(|s| s.reason.clone());
            }
        }
        for (suppression, _) in suppressions.iter().zip(&used).filter(|(_, used)| !**used) {
            let rule = suppression.rule.as_deref().unwrap_or("*");
            tracing::warn!(location = %suppression.location, rule, "unused suppression");
            warnings.push(format!(
                "suppression `{}` for rule `{}` matched no finding",
                suppression.location, rule
            ));
        }

        let summary = summarize(&findings);

        if !include_safe {
            findings.retain(|f| f.classification != Classification::Safe);
        }
        findings.sort_by(compare_findings);
        warnings.sort();
        warnings.dedup();

        Report {
            tool: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            findings,
            summary,
            warnings,
        }
    }
}

/// Report order: location, then violations before unknown, exempt and safe
/// findings, then access point id.
pub fn compare_findings(a: &Finding, b: &Finding) -> Ordering {
    a.location
        .cmp(&b.location)
        .then_with(|| a.classification.rank().cmp(&b.classification.rank()))
        .then_with(|| a.access_point_id.cmp(&b.access_point_id))
        .then_with(|| a.rationale.cmp(&b.rationale))
}

/// True when `a` should replace `b` as the finding for one access point.
fn more_severe(a: &Finding, b: &Finding) -> bool {
    (a.classification.rank(), std::cmp::Reverse(a.severity))
        < (b.classification.rank(), std::cmp::Reverse(b.severity))
}

/// One finding per access point, keeping the most severe. Findings without
/// an access point (unanalyzed handlers and documents) are deduplicated by
/// equality.
fn dedup(findings: Vec<Finding>) -> Vec<Finding> {
    let mut by_id: BTreeMap<String, Finding> = BTreeMap::new();
    let mut unidentified: Vec<Finding> = Vec::new();

    for finding in findings {
        match finding.access_point_id.clone() {
            Some(id) => match by_id.get(&id) {
                Some(existing) if !more_severe(&finding, existing) => {}
                _ => {
                    by_id.insert(id, finding);
                }
            },
            None => {
                if !unidentified.contains(&finding) {
                    unidentified.push(finding);
                }
            }
        }
    }

    by_id.into_values().chain(unidentified).collect()
}

fn summarize(findings: &[Finding]) -> Summary {
    let mut summary = Summary::default();
    for finding in findings {
        if finding.classification == Classification::Unknown {
            summary.analyzer_errors += 1;
        } else {
            summary.total += 1;
        }
        *summary
            .by_classification
            .entry(finding.classification)
            .or_insert(0) += 1;
        if let Some(kind) = finding.violation_kind {
            *summary.by_violation_kind.entry(kind).or_insert(0) += 1;
        }
        if let Some(severity) = finding.severity {
            *summary.by_severity.entry(severity).or_insert(0) += 1;
        }
        if finding.suppressed {
            summary.suppressed += 1;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuppressionEntry;
    use crate::facts::Location;
    use crate::isolation::{Severity, ViolationKind};
    use pretty_assertions::assert_eq;

    fn finding(
        file: &str,
        line: u32,
        classification: Classification,
        kind: Option<ViolationKind>,
    ) -> Finding {
        Finding {
            access_point_id: Some(format!("{file}:{line}:h#0")),
            location: Location::new(file, Some(line), "h"),
            classification,
            violation_kind: kind,
            rule_id: kind.map(|k| k.rule_id().to_string()),
            severity: kind.map(|_| Severity::High),
            entities: vec![],
            operation: None,
            rationale: String::new(),
            suggested_fix: None,
            error_code: None,
            suppressed: false,
            suppression_reason: None,
        }
    }

    #[test]
    fn test_sorted_by_location_regardless_of_arrival() {
        let mut agg = ReportAggregator::new(true, SuppressionList::default());
        agg.push(finding("b.py", 1, Classification::Safe, None));
        agg.push(finding("a.py", 20, Classification::Exempt, None));
        agg.push(finding("a.py", 3, Classification::Violation, Some(ViolationKind::MissingDependency)));

        let report = agg.finish();
        let order: Vec<_> = report
            .findings
            .iter()
            .map(|f| f.location.file_position())
            .collect();
        assert_eq!(order, vec!["a.py:3", "a.py:20", "b.py:1"]);
    }

    #[test]
    fn test_safe_omitted_but_counted() {
        let mut agg = ReportAggregator::new(false, SuppressionList::default());
        agg.push(finding("a.py", 1, Classification::Safe, None));
        agg.push(finding("a.py", 2, Classification::Violation, Some(ViolationKind::UnusedDependency)));

        let report = agg.finish();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.summary.count(Classification::Safe), 1);
        assert_eq!(report.summary.total, 2);
        assert!(report.has_blocking_violations());
    }

    #[test]
    fn test_dedup_keeps_most_severe() {
        let mut agg = ReportAggregator::new(true, SuppressionList::default());
        agg.push(finding("a.py", 1, Classification::Safe, None));
        agg.push(finding("a.py", 1, Classification::Violation, Some(ViolationKind::MissingDependency)));
        agg.push(finding("a.py", 1, Classification::Safe, None));

        let report = agg.finish();
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].classification, Classification::Violation);
    }

    #[test]
    fn test_suppressed_violation_does_not_block() {
        let suppressions = SuppressionList::from_config(&[
            SuppressionEntry {
                location: "a.py:2".into(),
                rule: "tenant/unused-dependency".into(),
                reason: Some("read-only dashboard".into()),
            },
            SuppressionEntry {
                location: "never.py".into(),
                rule: "*".into(),
                reason: None,
            },
        ]);
        let mut agg = ReportAggregator::new(false, suppressions);
        agg.push(finding("a.py", 2, Classification::Violation, Some(ViolationKind::UnusedDependency)));

        let report = agg.finish();
        assert!(!report.has_blocking_violations());
        assert!(report.findings[0].suppressed);
        assert_eq!(
            report.findings[0].suppression_reason.as_deref(),
            Some("read-only dashboard")
        );
        assert_eq!(report.summary.suppressed, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("never.py"));
    }
}
