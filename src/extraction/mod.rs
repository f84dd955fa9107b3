//! Access-point extraction.
//!
//! Turns the parser's handler facts into [`AccessPoint`] records: one per
//! data-access operation, with dependencies normalized to [`ProviderKind`],
//! predicates normalized to [`Predicate`] and the control-flow summary
//! reduced to the set of paths that actually execute the operation.

pub mod control_flow;
pub mod extractor;
pub mod predicates;
pub mod providers;

pub use extractor::AccessPointExtractor;
pub use providers::ProviderTable;

use crate::errors::ExtractionError;
use crate::facts::{Conjunction, Location, OperationKind};
use crate::schema::{EntityRef, Entity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// What capability an injected dependency supplies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    TenantContextProvider,
    AdminProvider,
    Other,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenantContextProvider => f.write_str("tenant context"),
            Self::AdminProvider => f.write_str("admin"),
            Self::Other => f.write_str("other"),
        }
    }
}

/// Why a handler is allowed to bypass tenant scoping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExemptionKind {
    /// The handler depends on an admin provider.
    AdminProvider,
    /// The handler's route is under a configured admin prefix.
    AdminRoute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Equals,
    Other,
}

/// Where the right-hand side of a predicate comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RhsSource {
    TenantContextValue,
    Literal,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    /// Entity the column was resolved against.
    pub entity: EntityRef,
    pub column: String,
    pub comparison: Comparison,
    pub rhs_source: RhsSource,
    pub conjunction: Conjunction,
    /// Set when the predicate only applies on one branch.
    pub branch: Option<String>,
}

impl Predicate {
    /// Equality on the entity's scoping column against a tenant-context
    /// value. How the predicate combines with its siblings is checked per
    /// path by [`control_flow::covers_every_path`].
    pub fn satisfies_scoping(&self, entity: &Entity) -> bool {
        self.entity == entity.name
            && entity.scoping_column.as_deref() == Some(self.column.as_str())
            && self.comparison == Comparison::Equals
            && self.rhs_source == RhsSource::TenantContextValue
    }

    /// Whether the predicate is in effect on the path labelled `path`.
    pub fn active_on(&self, path: Option<&str>) -> bool {
        match &self.branch {
            None => true,
            Some(branch) => Some(branch.as_str()) == path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessPoint {
    /// `file:line:handler#index`, stable across runs.
    pub id: String,
    pub location: Location,
    pub operation_kind: OperationKind,
    pub target_entities: BTreeSet<EntityRef>,
    pub dependencies: BTreeSet<ProviderKind>,
    pub exemptions: BTreeSet<ExemptionKind>,
    pub predicates: Vec<Predicate>,
    /// Branch labels of the paths that build and execute the operation.
    /// `None` is the unlabelled straight-line path.
    pub execution_paths: Vec<Option<String>>,
    pub reaches_execution: bool,
}

impl AccessPoint {
    pub fn has_dependency(&self, kind: ProviderKind) -> bool {
        self.dependencies.contains(&kind)
    }

    pub fn is_exempt(&self) -> bool {
        !self.exemptions.is_empty()
    }
}

/// A handler whose facts could not be turned into access points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    pub location: Location,
    pub error: ExtractionError,
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.error)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}
