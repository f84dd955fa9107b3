//! Predicate normalization.

use super::{Comparison, Predicate, RhsSource};
use crate::errors::ExtractionError;
use crate::facts::{BindingFact, PredicateFact, RhsFact};
use crate::schema::Entity;
use std::collections::{BTreeMap, BTreeSet};

const EQUALITY_OPERATORS: &[&str] = &["==", "=", "eq", "is", "__eq__"];

pub fn normalize_comparison(op: &str) -> Comparison {
    if EQUALITY_OPERATORS.contains(&op.trim()) {
        Comparison::Equals
    } else {
        Comparison::Other
    }
}

/// Leading identifier of an expression: `workspace` for `workspace.id`,
/// `ctx` for `ctx["workspace"]`.
pub fn root_identifier(expr: &str) -> &str {
    let expr = expr.trim();
    let end = expr
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(expr.len());
    &expr[..end]
}

/// Traces predicate right-hand sides back to tenant-context dependencies.
#[derive(Debug, Clone)]
pub struct RhsResolver<'a> {
    bindings: BTreeMap<&'a str, &'a str>,
    tenant_values: BTreeSet<&'a str>,
}

impl<'a> RhsResolver<'a> {
    /// `tenant_values` are the parameter names of dependencies classified as
    /// tenant-context providers.
    pub fn new(bindings: &'a [BindingFact], tenant_values: BTreeSet<&'a str>) -> Self {
        Self {
            bindings: bindings
                .iter()
                .map(|b| (b.name.as_str(), b.expr.as_str()))
                .collect(),
            tenant_values,
        }
    }

    pub fn resolve(&self, rhs: &RhsFact) -> RhsSource {
        match rhs {
            RhsFact::Literal { .. } => RhsSource::Literal,
            RhsFact::Unknown => RhsSource::Unknown,
            RhsFact::Reference { expr } => {
                if self.traces_to_tenant(expr) {
                    RhsSource::TenantContextValue
                } else {
                    RhsSource::Unknown
                }
            }
        }
    }

    /// Follow local aliases until reaching a tenant-context dependency, an
    /// unbound name, or a cycle.
    fn traces_to_tenant(&self, expr: &str) -> bool {
        let mut seen = BTreeSet::new();
        let mut root = root_identifier(expr);
        loop {
            if self.tenant_values.contains(root) {
                return true;
            }
            if !seen.insert(root) {
                return false;
            }
            match self.bindings.get(root) {
                Some(bound) => root = root_identifier(bound),
                None => return false,
            }
        }
    }
}

/// Bind a predicate column (`Entity.column` or `column`) to one of the
/// operation's target entities.
pub fn resolve_column(
    column: &str,
    targets: &[&Entity],
    operation: usize,
) -> Result<(String, String), ExtractionError> {
    let column = column.trim();
    if column.is_empty() {
        return Err(ExtractionError::EmptyColumn { operation });
    }

    if let Some((qualifier, name)) = column.rsplit_once('.') {
        // `models.User.id` qualifies by `User`.
        let qualifier = qualifier.rsplit('.').next().unwrap_or(qualifier);
        let entity = targets
            .iter()
            .find(|e| e.name == qualifier || e.storage_key == qualifier)
            .ok_or_else(|| ExtractionError::ForeignQualifier {
                qualifier: qualifier.to_string(),
                column: name.to_string(),
                operation,
            })?;
        if name.is_empty() {
            return Err(ExtractionError::EmptyColumn { operation });
        }
        if !entity.accepts_column(name) {
            return Err(ExtractionError::UnknownColumn {
                entity: entity.name.clone(),
                column: name.to_string(),
                operation,
            });
        }
        return Ok((entity.name.clone(), name.to_string()));
    }

    if let [only] = targets {
        if !only.accepts_column(column) {
            return Err(ExtractionError::UnknownColumn {
                entity: only.name.clone(),
                column: column.to_string(),
                operation,
            });
        }
        return Ok((only.name.clone(), column.to_string()));
    }

    let declaring: Vec<&&Entity> = targets
        .iter()
        .filter(|e| e.columns.contains(column))
        .collect();
    match declaring.as_slice() {
        [entity] => Ok((entity.name.clone(), column.to_string())),
        _ => Err(ExtractionError::AmbiguousColumn {
            column: column.to_string(),
            candidates: targets
                .iter()
                .map(|e| e.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            operation,
        }),
    }
}

/// Normalize one predicate fact.
pub fn normalize_predicate(
    fact: &PredicateFact,
    targets: &[&Entity],
    resolver: &RhsResolver<'_>,
    operation: usize,
) -> Result<Predicate, ExtractionError> {
    let (entity, column) = resolve_column(&fact.column, targets, operation)?;
    Ok(Predicate {
        entity,
        column,
        comparison: normalize_comparison(&fact.comparison),
        rhs_source: resolver.resolve(&fact.rhs),
        conjunction: fact.joined_by,
        branch: fact.branch.clone(),
    })
}
