//! Error taxonomy for tenant-isolation analysis.
//!
//! Errors are split by the stage that raises them, because each stage has a
//! different propagation policy:
//!
//! - [`SchemaError`]: fatal to the run. Every verdict depends on entity
//!   classification, so a conflicting schema aborts analysis.
//! - [`ExtractionError`]: recovered per handler. The handler shows up in the
//!   report as `Unknown` and the run continues (unless strict mode is on).
//! - [`EvaluationError`]: the evaluator is total over well-formed access
//!   points, so any occurrence is an internal defect and is surfaced as an
//!   analyzer error, never as a violation.
//! - [`ConfigError`]: invalid or unreadable configuration.
//!
//! [`AnalysisError`] is the umbrella returned by the pipeline when a run has
//! to stop.
//!
//! # Error Codes
//!
//! - E001-E009: loading fact documents
//! - E010-E019: schema classification
//! - E020-E029: access-point extraction
//! - E030-E039: isolation evaluation
//! - E040-E049: configuration

pub mod collection;

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error code for documentation and programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ErrorCode(&'static str);

impl ErrorCode {
    /// Fact document could not be read
    pub const LOAD_IO: ErrorCode = ErrorCode("E001");
    /// Fact document is not valid JSON/YAML for the fact format
    pub const LOAD_PARSE: ErrorCode = ErrorCode("E002");

    /// Entity carries conflicting scope annotations
    pub const SCHEMA_CONFLICT: ErrorCode = ErrorCode("E010");
    /// Tenant-scoped entity without a usable scoping column
    pub const SCHEMA_SCOPING_COLUMN: ErrorCode = ErrorCode("E011");
    /// Same entity or storage key declared twice with different facts
    pub const SCHEMA_DUPLICATE: ErrorCode = ErrorCode("E012");

    /// Operation targets an entity the schema does not know
    pub const EXTRACT_UNKNOWN_ENTITY: ErrorCode = ErrorCode("E020");
    /// Predicate references a column that cannot be resolved
    pub const EXTRACT_UNKNOWN_COLUMN: ErrorCode = ErrorCode("E021");
    /// Structurally incomplete handler facts
    pub const EXTRACT_INCOMPLETE: ErrorCode = ErrorCode("E022");
    /// Per-file scan cap exceeded
    pub const EXTRACT_SCAN_CAP: ErrorCode = ErrorCode("E023");

    /// Evaluator received a malformed access point
    pub const EVALUATION_INTERNAL: ErrorCode = ErrorCode("E030");

    /// Configuration file could not be read or parsed
    pub const CONFIG_PARSE: ErrorCode = ErrorCode("E040");
    /// Configuration value is invalid
    pub const CONFIG_INVALID: ErrorCode = ErrorCode("E041");

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conflicting or incomplete schema facts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("entity `{entity}` is annotated both {first} and {second}")]
    ConflictingAnnotations {
        entity: String,
        first: String,
        second: String,
    },

    #[error("entity `{entity}` is tenant-scoped but has no scoping column (expected one of: {expected})")]
    MissingScopingColumn { entity: String, expected: String },

    #[error("entity `{entity}` declares scoping column `{column}` which is not one of its columns")]
    UnknownScopingColumn { entity: String, column: String },

    #[error("entity `{entity}` is declared with storage keys `{first}` and `{second}`")]
    DuplicateEntity {
        entity: String,
        first: String,
        second: String,
    },

    #[error("storage key `{storage_key}` is used by both `{first}` and `{second}`")]
    DuplicateStorageKey {
        storage_key: String,
        first: String,
        second: String,
    },
}

impl SchemaError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::ConflictingAnnotations { .. } => ErrorCode::SCHEMA_CONFLICT,
            Self::MissingScopingColumn { .. } | Self::UnknownScopingColumn { .. } => {
                ErrorCode::SCHEMA_SCOPING_COLUMN
            }
            Self::DuplicateEntity { .. } | Self::DuplicateStorageKey { .. } => {
                ErrorCode::SCHEMA_DUPLICATE
            }
        }
    }
}

/// Malformed or incomplete handler facts. `operation` is the index of the
/// offending operation inside its handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionError {
    #[error("operation #{operation} targets unknown entity `{entity}`")]
    UnknownEntity { entity: String, operation: usize },

    #[error("operation #{operation} has no target entities")]
    NoTargets { operation: usize },

    #[error("operation #{operation} filters on `{entity}.{column}`, which is not a column of `{entity}`")]
    UnknownColumn {
        entity: String,
        column: String,
        operation: usize,
    },

    #[error("operation #{operation} filters on `{column}`, which could belong to any of: {candidates}")]
    AmbiguousColumn {
        column: String,
        candidates: String,
        operation: usize,
    },

    #[error("operation #{operation} filters on `{qualifier}.{column}` but does not target `{qualifier}`")]
    ForeignQualifier {
        qualifier: String,
        column: String,
        operation: usize,
    },

    #[error("operation #{operation} has an empty predicate column")]
    EmptyColumn { operation: usize },

    #[error("scan cap exceeded: {limit} is {value} (max {max})")]
    ScanCapExceeded {
        limit: &'static str,
        value: usize,
        max: usize,
    },
}

impl ExtractionError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownEntity { .. } => ErrorCode::EXTRACT_UNKNOWN_ENTITY,
            Self::UnknownColumn { .. }
            | Self::AmbiguousColumn { .. }
            | Self::ForeignQualifier { .. } => ErrorCode::EXTRACT_UNKNOWN_COLUMN,
            Self::NoTargets { .. } | Self::EmptyColumn { .. } => ErrorCode::EXTRACT_INCOMPLETE,
            Self::ScanCapExceeded { .. } => ErrorCode::EXTRACT_SCAN_CAP,
        }
    }
}

/// The evaluator was handed an access point the extractor should never
/// have produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("access point {access_point} targets `{entity}`, which is not in the classified schema")]
    UnknownEntity {
        access_point: String,
        entity: String,
    },

    #[error("access point {access_point} targets tenant-scoped `{entity}` without a scoping column")]
    MissingScopingColumn {
        access_point: String,
        entity: String,
    },

    #[error("access point {access_point} reaches execution but carries no execution paths")]
    NoExecutionPaths { access_point: String },
}

impl EvaluationError {
    pub fn code(&self) -> ErrorCode {
        ErrorCode::EVALUATION_INTERNAL
    }
}

/// Configuration problems.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("invalid configuration value for `{field}`: {message}")]
    Invalid { field: String, message: String },

    #[error("invalid glob pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl ConfigError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Read { .. } | Self::Parse { .. } => ErrorCode::CONFIG_PARSE,
            Self::Invalid { .. } | Self::InvalidPattern { .. } => ErrorCode::CONFIG_INVALID,
        }
    }
}

/// Errors that stop an analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("extraction failed in {location}: {source}")]
    Extraction {
        location: String,
        #[source]
        source: ExtractionError,
    },

    #[error("internal evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("failed to load facts from {}: {message}", path.display())]
    Load {
        path: PathBuf,
        code: ErrorCode,
        message: String,
    },
}

impl AnalysisError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(e) => e.code(),
            Self::Schema(e) => e.code(),
            Self::Extraction { source, .. } => source.code(),
            Self::Evaluation(e) => e.code(),
            Self::Load { code, .. } => *code,
        }
    }

    /// Short category name used in terminal output.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "Config",
            Self::Schema(_) => "Schema",
            Self::Extraction { .. } => "Extraction",
            Self::Evaluation(_) => "Evaluation",
            Self::Load { .. } => "Load",
        }
    }
}
