// Export modules for library usage
pub mod cli;
pub mod commands;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod facts;
pub mod formatting;
pub mod io;
pub mod isolation;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod schema;
pub mod testkit;

// Re-export commonly used types
pub use crate::config::{load_config, TenantGuardConfig};
pub use crate::errors::{AnalysisError, EvaluationError, ExtractionError, SchemaError};
pub use crate::extraction::{AccessPoint, AccessPointExtractor, ProviderKind};
pub use crate::facts::loader::SourceUnit;
pub use crate::facts::{FactsDocument, HandlerFact, SchemaFact};
pub use crate::io::output::{create_writer, OutputFormat, ReportWriter};
pub use crate::isolation::{evaluate, Classification, Severity, Verdict, ViolationKind};
pub use crate::pipeline::{analyze, classify_units, load_units, run};
pub use crate::report::{ExitStatus, Finding, Report, Summary};
pub use crate::schema::{classify, ClassifiedSchema, Entity, TenantScope};
