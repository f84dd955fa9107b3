//! Testing infrastructure for tenantguard.
//!
//! Builds fact documents in code instead of JSON files, so unit tests,
//! integration tests and benchmarks share one vocabulary:
//!
//! - **Builders**: [`SchemaFactBuilder`], [`HandlerFactBuilder`],
//!   [`OperationFactBuilder`] for fluent construction of parser facts
//! - **Fixtures**: the reference application ([`fixture_schema`],
//!   [`fixture_handlers`], [`fixture_config`]) with one handler per verdict
//! - **Lookups**: [`finding_for`] to pick a handler's finding out of a report
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use tenantguard::testkit::{fixture_config, fixture_units, finding_for};
//! use tenantguard::pipeline::analyze;
//!
//! let report = analyze(&fixture_units(), &[], &fixture_config()).unwrap();
//! let finding = finding_for(&report, "update_project_bad").unwrap();
//! assert!(finding.is_blocking());
//! ```

pub mod builders;
pub mod fixtures;

pub use builders::{HandlerFactBuilder, OperationFactBuilder, SchemaFactBuilder};
pub use fixtures::{
    fixture_config, fixture_document, fixture_handlers, fixture_schema, fixture_units,
};

use crate::report::{Finding, Report};

/// The first finding reported for `handler`.
pub fn finding_for<'r>(report: &'r Report, handler: &str) -> Option<&'r Finding> {
    report
        .findings
        .iter()
        .find(|f| f.location.handler == handler)
}
