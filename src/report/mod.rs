//! The analysis report.
//!
//! A [`Report`] is the single product of a run: sorted findings plus
//! summary counts. Every map in it is a `BTreeMap`, so serializing the same
//! report always yields the same bytes.

pub mod aggregator;
pub mod suppression;

pub use aggregator::ReportAggregator;
pub use suppression::{SuppressionList, SuppressionTarget};

use crate::errors::collection::AnalysisFailure;
use crate::extraction::{AccessPoint, HandlerError};
use crate::facts::{Location, OperationKind};
use crate::isolation::{Classification, Severity, Verdict, ViolationKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_point_id: Option<String>,
    pub location: Location,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_kind: Option<ViolationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub entities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
    /// Error code for findings the analyzer could not classify.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(default)]
    pub suppressed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppression_reason: Option<String>,
}

impl Finding {
    pub fn from_verdict(point: &AccessPoint, verdict: Verdict) -> Self {
        Self {
            access_point_id: Some(verdict.access_point_id),
            location: point.location.clone(),
            classification: verdict.classification,
            violation_kind: verdict.violation_kind,
            rule_id: verdict.violation_kind.map(|k| k.rule_id().to_string()),
            severity: verdict.severity,
            entities: point.target_entities.iter().cloned().collect(),
            operation: Some(point.operation_kind),
            rationale: verdict.rationale,
            suggested_fix: verdict.suggested_fix,
            error_code: None,
            suppressed: false,
            suppression_reason: None,
        }
    }

    /// A handler whose facts could not be extracted.
    pub fn unknown_handler(error: &HandlerError) -> Self {
        Self::unknown(
            error.location.clone(),
            format!("could not analyze handler: {}", error.error),
            error.error.code().to_string(),
        )
    }

    /// A fact document that could not be loaded.
    pub fn unknown_unit(failure: &AnalysisFailure) -> Self {
        Self::unknown(
            Location::new(failure.path.display().to_string(), None, ""),
            format!("{} failed: {}", failure.operation.as_str(), failure.error),
            failure.code.to_string(),
        )
    }

    fn unknown(location: Location, rationale: String, code: String) -> Self {
        Self {
            access_point_id: None,
            location,
            classification: Classification::Unknown,
            violation_kind: None,
            rule_id: None,
            severity: None,
            entities: Vec::new(),
            operation: None,
            rationale,
            suggested_fix: None,
            error_code: Some(code),
            suppressed: false,
            suppression_reason: None,
        }
    }

    pub fn is_violation(&self) -> bool {
        self.classification == Classification::Violation
    }

    /// An unsuppressed violation.
    pub fn is_blocking(&self) -> bool {
        self.is_violation() && !self.suppressed
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Verdicts produced, including safe ones left out of `findings`.
    pub total: usize,
    pub by_classification: BTreeMap<Classification, usize>,
    pub by_violation_kind: BTreeMap<ViolationKind, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub suppressed: usize,
    /// Handlers and documents reported as `Unknown`.
    pub analyzer_errors: usize,
}

impl Summary {
    pub fn count(&self, classification: Classification) -> usize {
        self.by_classification
            .get(&classification)
            .copied()
            .unwrap_or(0)
    }

    pub fn violations(&self) -> usize {
        self.count(Classification::Violation)
    }
}

/// Process exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitStatus {
    /// No blocking violations and nothing left unanalyzed.
    Clean,
    /// Blocking violations present.
    Violations,
    /// The analyzer could not complete the run.
    Fatal,
    /// No blocking violations, but some handlers or documents are `Unknown`.
    Incomplete,
}

impl ExitStatus {
    pub fn code(&self) -> i32 {
        match self {
            Self::Clean => 0,
            Self::Violations => 1,
            Self::Fatal => 2,
            Self::Incomplete => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub tool: String,
    pub version: String,
    pub findings: Vec<Finding>,
    pub summary: Summary,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl Report {
    pub fn has_blocking_violations(&self) -> bool {
        self.findings.iter().any(Finding::is_blocking)
    }

    /// Violations take precedence over unanalyzed handlers.
    pub fn exit_status(&self) -> ExitStatus {
        if self.has_blocking_violations() {
            ExitStatus::Violations
        } else if self.summary.analyzer_errors > 0 {
            ExitStatus::Incomplete
        } else {
            ExitStatus::Clean
        }
    }

    pub fn blocking(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_blocking())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExtractionError;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitStatus::Clean.code(), 0);
        assert_eq!(ExitStatus::Violations.code(), 1);
        assert_eq!(ExitStatus::Fatal.code(), 2);
        assert_eq!(ExitStatus::Incomplete.code(), 3);
    }

    #[test]
    fn test_unknown_handler_finding_carries_error_code() {
        let finding = Finding::unknown_handler(&HandlerError {
            location: Location::new("routes.py", Some(9), "broken"),
            error: ExtractionError::NoTargets { operation: 0 },
        });
        assert_eq!(finding.classification, Classification::Unknown);
        assert_eq!(finding.error_code.as_deref(), Some("E022"));
        assert!(!finding.is_blocking());
    }

    #[test]
    fn test_summary_map_keys_serialize_as_strings() {
        let mut summary = Summary::default();
        summary.by_classification.insert(Classification::Violation, 2);
        summary
            .by_violation_kind
            .insert(ViolationKind::MissingDependency, 2);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"violation\":2"));
        assert!(json.contains("\"missing_dependency\":2"));
    }
}
