//! The isolation rule engine.
//!
//! [`evaluate`] is a pure function of an access point and the classified
//! schema. It holds no state and does no I/O, so it can run on any worker.

use super::{Verdict, ViolationKind};
use crate::errors::EvaluationError;
use crate::extraction::control_flow::covers_every_path;
use crate::extraction::{AccessPoint, ExemptionKind, ProviderKind};
use crate::facts::OperationKind;
use crate::schema::{ClassifiedSchema, Entity};

/// Decide the verdict for one access point.
///
/// Returns `Ok(None)` for operations that never reach execution; those are
/// not reportable.
pub fn evaluate(
    point: &AccessPoint,
    schema: &ClassifiedSchema,
) -> Result<Option<Verdict>, EvaluationError> {
    if !point.reaches_execution {
        return Ok(None);
    }
    if point.execution_paths.is_empty() {
        return Err(EvaluationError::NoExecutionPaths {
            access_point: point.id.clone(),
        });
    }

    if point.is_exempt() {
        return Ok(Some(Verdict::exempt(&point.id, exemption_rationale(point))));
    }

    let targets = resolve_targets(point, schema)?;
    let required: Vec<&Entity> = targets.into_iter().filter(|e| e.is_tenant_scoped()).collect();

    if required.is_empty() {
        return Ok(Some(Verdict::safe(
            &point.id,
            "targets only global entities; no tenant filter required",
        )));
    }

    let names = entity_list(&required);

    if !point.has_dependency(ProviderKind::TenantContextProvider) {
        return Ok(Some(Verdict::violation(
            &point.id,
            ViolationKind::MissingDependency,
            point.operation_kind,
            format!(
                "{} on tenant-scoped {} without a tenant-context dependency",
                point.operation_kind, names
            ),
            format!(
                "inject the tenant context into the handler and filter by {}",
                scoping_filters(&required)
            ),
        )));
    }

    let (covered, uncovered): (Vec<&Entity>, Vec<&Entity>) = required
        .iter()
        .copied()
        .partition(|entity| is_covered(point, entity));

    if uncovered.is_empty() {
        return Ok(Some(Verdict::safe(
            &point.id,
            format!(
                "filtered by {} on every execution path",
                scoping_filters(&covered)
            ),
        )));
    }

    let missing = scoping_filters(&uncovered);
    let fix = fix_for(point.operation_kind, &missing);

    let verdict = if !covered.is_empty() {
        Verdict::violation(
            &point.id,
            ViolationKind::PartialFilterCoverage,
            point.operation_kind,
            format!(
                "{} is scoped for {} but not for {}",
                point.operation_kind,
                entity_list(&covered),
                entity_list(&uncovered)
            ),
            fix,
        )
    } else if point.operation_kind.is_mutation() {
        Verdict::violation(
            &point.id,
            ViolationKind::MissingFilterOnMutation,
            point.operation_kind,
            format!(
                "{} on {} is not restricted to the caller's tenant{}",
                point.operation_kind,
                names,
                branch_note(point)
            ),
            fix,
        )
    } else {
        Verdict::violation(
            &point.id,
            ViolationKind::UnusedDependency,
            point.operation_kind,
            format!(
                "tenant context is injected but the read on {} does not filter by it{}",
                names,
                branch_note(point)
            ),
            fix,
        )
    };
    Ok(Some(verdict))
}

fn resolve_targets<'s>(
    point: &AccessPoint,
    schema: &'s ClassifiedSchema,
) -> Result<Vec<&'s Entity>, EvaluationError> {
    point
        .target_entities
        .iter()
        .map(|name| {
            let entity = schema
                .get(name)
                .ok_or_else(|| EvaluationError::UnknownEntity {
                    access_point: point.id.clone(),
                    entity: name.clone(),
                })?;
            if entity.is_tenant_scoped() && entity.scoping_column.is_none() {
                return Err(EvaluationError::MissingScopingColumn {
                    access_point: point.id.clone(),
                    entity: name.clone(),
                });
            }
            Ok(entity)
        })
        .collect()
}

fn is_covered(point: &AccessPoint, entity: &Entity) -> bool {
    covers_every_path(&point.execution_paths, &point.predicates, |p| {
        p.satisfies_scoping(entity)
    })
}

fn exemption_rationale(point: &AccessPoint) -> String {
    let reasons: Vec<&str> = point
        .exemptions
        .iter()
        .map(|e| match e {
            ExemptionKind::AdminProvider => "admin-only dependency",
            ExemptionKind::AdminRoute => "admin route",
        })
        .collect();
    format!("exempt from tenant scoping ({})", reasons.join(", "))
}

fn entity_list(entities: &[&Entity]) -> String {
    entities
        .iter()
        .map(|e| e.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn scoping_filters(entities: &[&Entity]) -> String {
    entities
        .iter()
        .map(|e| format!("{}.{}", e.name, e.scoping_column.as_deref().unwrap_or("?")))
        .collect::<Vec<_>>()
        .join(", ")
}

fn branch_note(point: &AccessPoint) -> &'static str {
    let filtered_on_branch = point.predicates.iter().any(|p| p.branch.is_some());
    if point.execution_paths.len() > 1 && filtered_on_branch {
        " on every execution path"
    } else {
        ""
    }
}

fn fix_for(kind: OperationKind, missing: &str) -> String {
    match kind {
        OperationKind::Create => {
            format!("set {missing} from the tenant context when inserting")
        }
        _ => format!("add a filter on {missing} == <tenant context>.id"),
    }
}
