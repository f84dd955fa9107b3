//! Isolation verdicts.

pub mod evaluator;

pub use evaluator::evaluate;

use crate::facts::OperationKind;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Safe,
    Exempt,
    Violation,
    /// The handler could not be analyzed.
    Unknown,
}

impl Classification {
    /// Position in a report at the same location: violations first.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Violation => 0,
            Self::Unknown => 1,
            Self::Exempt => 2,
            Self::Safe => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Exempt => "exempt",
            Self::Violation => "violation",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A tenant-scoped entity is accessed without any tenant-context
    /// dependency in the handler.
    MissingDependency,
    /// The tenant context is injected but a read ignores it.
    UnusedDependency,
    /// A mutation is not restricted to the caller's tenant.
    MissingFilterOnMutation,
    /// Some tenant-scoped targets are filtered, others are not.
    PartialFilterCoverage,
}

impl ViolationKind {
    pub const ALL: [ViolationKind; 4] = [
        Self::MissingDependency,
        Self::UnusedDependency,
        Self::MissingFilterOnMutation,
        Self::PartialFilterCoverage,
    ];

    /// Stable identifier used by suppressions and machine-readable output.
    pub fn rule_id(&self) -> &'static str {
        match self {
            Self::MissingDependency => "tenant/missing-dependency",
            Self::UnusedDependency => "tenant/unused-dependency",
            Self::MissingFilterOnMutation => "tenant/missing-filter-on-mutation",
            Self::PartialFilterCoverage => "tenant/partial-filter-coverage",
        }
    }

    /// Triage level of this kind of violation on the given operation.
    pub fn severity(&self, operation: OperationKind) -> Severity {
        match (self, operation) {
            (_, OperationKind::Update | OperationKind::Delete) => Severity::Critical,
            (Self::UnusedDependency, _) => Severity::Medium,
            _ => Severity::High,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::MissingDependency => "missing dependency",
            Self::UnusedDependency => "unused dependency",
            Self::MissingFilterOnMutation => "missing filter on mutation",
            Self::PartialFilterCoverage => "partial filter coverage",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The evaluator's decision for one access point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub access_point_id: String,
    pub classification: Classification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub violation_kind: Option<ViolationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    pub rationale: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_fix: Option<String>,
}

impl Verdict {
    pub fn safe(access_point_id: &str, rationale: impl Into<String>) -> Self {
        Self {
            access_point_id: access_point_id.to_string(),
            classification: Classification::Safe,
            violation_kind: None,
            severity: None,
            rationale: rationale.into(),
            suggested_fix: None,
        }
    }

    pub fn exempt(access_point_id: &str, rationale: impl Into<String>) -> Self {
        Self {
            classification: Classification::Exempt,
            ..Self::safe(access_point_id, rationale)
        }
    }

    pub fn violation(
        access_point_id: &str,
        kind: ViolationKind,
        operation: OperationKind,
        rationale: impl Into<String>,
        suggested_fix: impl Into<String>,
    ) -> Self {
        Self {
            access_point_id: access_point_id.to_string(),
            classification: Classification::Violation,
            violation_kind: Some(kind),
            severity: Some(kind.severity(operation)),
            rationale: rationale.into(),
            suggested_fix: Some(suggested_fix.into()),
        }
    }

    pub fn is_violation(&self) -> bool {
        self.classification == Classification::Violation
    }
}
