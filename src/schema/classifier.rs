//! Tenant-scope classification of schema entities.
//!
//! Classification runs in three steps:
//!
//! 1. Explicit labels: scope annotations in the facts and the
//!    `tenant_tables` / `global_tables` / `tenant_roots` configuration lists.
//! 2. Tenant roots: explicitly labelled roots plus, with `infer_roots`, the
//!    target of a scoping-column foreign key when it is labelled global, or
//!    unlabelled and without such a key of its own
//!    (`User.workspace_id -> Workspace` makes `Workspace` a root). A global
//!    label is kept on a root.
//! 3. Propagation: an unlabelled entity with a scoping-column foreign key to
//!    a tenant-scoped or root entity becomes tenant-scoped. This runs to a
//!    fixpoint over sets, and ties between candidate columns are broken by
//!    convention priority and then column name, so declaration order never
//!    changes the result.
//!
//! Whatever is left follows `unresolved_scope`.

use super::{ClassificationSource, ClassifiedSchema, Entity, Relationship, TenantScope};
use crate::config::{SchemaConfig, UnresolvedScope};
use crate::errors::SchemaError;
use crate::facts::{ScopeAnnotation, SchemaFact};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
enum Convention {
    Exact(String),
    Glob(glob::Pattern),
}

impl Convention {
    fn matches(&self, column: &str) -> bool {
        match self {
            Self::Exact(name) => name == column,
            Self::Glob(pattern) => pattern.matches(column),
        }
    }
}

/// Scoping-column naming conventions in priority order.
#[derive(Debug, Clone)]
pub struct ScopingConventions {
    conventions: Vec<Convention>,
    raw: Vec<String>,
}

impl ScopingConventions {
    pub fn new(columns: &[String]) -> Self {
        let conventions = columns
            .iter()
            .map(|c| {
                if c.contains('*') {
                    glob::Pattern::new(c)
                        .map(Convention::Glob)
                        .unwrap_or_else(|_| Convention::Exact(c.clone()))
                } else {
                    Convention::Exact(c.clone())
                }
            })
            .collect();
        Self {
            conventions,
            raw: columns.to_vec(),
        }
    }

    /// Index of the first convention `column` matches.
    pub fn priority(&self, column: &str) -> Option<usize> {
        self.conventions.iter().position(|c| c.matches(column))
    }

    pub fn matches(&self, column: &str) -> bool {
        self.priority(column).is_some()
    }

    /// The highest-priority convention column among `columns`, ties broken
    /// by name.
    pub fn best<'a, I>(&self, columns: I) -> Option<&'a String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        columns
            .into_iter()
            .filter_map(|c| self.priority(c).map(|p| (p, c)))
            .min()
            .map(|(_, c)| c)
    }

    pub fn describe(&self) -> String {
        self.raw.join(", ")
    }
}

/// Merge schema facts spread across source units.
///
/// Facts for the same entity are folded together. The result is sorted by
/// entity name with sorted, deduplicated columns and foreign keys, so the
/// output does not depend on the order facts were supplied in.
pub fn merge_schema_facts<'a, I>(facts: I) -> Result<Vec<SchemaFact>, SchemaError>
where
    I: IntoIterator<Item = &'a SchemaFact>,
{
    let mut merged: BTreeMap<String, SchemaFact> = BTreeMap::new();

    for fact in facts {
        match merged.get_mut(&fact.entity_name) {
            None => {
                merged.insert(fact.entity_name.clone(), fact.clone());
            }
            Some(existing) if existing.storage_key != fact.storage_key => {
                let (first, second) = ordered(&existing.storage_key, &fact.storage_key);
                return Err(SchemaError::DuplicateEntity {
                    entity: fact.entity_name.clone(),
                    first,
                    second,
                });
            }
            Some(existing) => fold_fact(existing, fact),
        }
    }

    let mut storage_keys: BTreeMap<&str, &str> = BTreeMap::new();
    for fact in merged.values() {
        if let Some(previous) = storage_keys.insert(&fact.storage_key, &fact.entity_name) {
            return Err(SchemaError::DuplicateStorageKey {
                storage_key: fact.storage_key.clone(),
                first: previous.to_string(),
                second: fact.entity_name.clone(),
            });
        }
    }

    Ok(merged.into_values().map(normalize_fact).collect())
}

fn ordered(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn fold_fact(existing: &mut SchemaFact, other: &SchemaFact) {
    existing.columns.extend(other.columns.iter().cloned());
    existing
        .foreign_keys
        .extend(other.foreign_keys.iter().cloned());
    for annotation in &other.annotations {
        if !existing.annotations.contains(annotation) {
            existing.annotations.push(annotation.clone());
        }
    }
    // Keep the smallest known declaration site.
    let current = (existing.file.clone(), existing.line);
    let candidate = (other.file.clone(), other.line);
    if candidate.0.is_some() && (current.0.is_none() || candidate < current) {
        existing.file = candidate.0;
        existing.line = candidate.1;
    }
}

fn normalize_fact(mut fact: SchemaFact) -> SchemaFact {
    fact.columns.sort();
    fact.columns.dedup();
    fact.foreign_keys.sort_by(|a, b| {
        (&a.column, &a.references, &a.referenced_column).cmp(&(
            &b.column,
            &b.references,
            &b.referenced_column,
        ))
    });
    fact.foreign_keys.dedup();
    let mut unique = Vec::with_capacity(fact.annotations.len());
    for annotation in fact.annotations {
        if !unique.contains(&annotation) {
            unique.push(annotation);
        }
    }
    fact.annotations = unique;
    fact
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExplicitLabel {
    Tenant {
        column: String,
        source: ClassificationSource,
    },
    Global(ClassificationSource),
    Root(ClassificationSource),
    Unlabelled,
}

fn listed(list: &[String], fact: &SchemaFact) -> bool {
    list.iter()
        .any(|entry| *entry == fact.entity_name || *entry == fact.storage_key)
}

fn explicit_label(
    fact: &SchemaFact,
    config: &SchemaConfig,
    conventions: &ScopingConventions,
) -> Result<ExplicitLabel, SchemaError> {
    let tenant_columns: BTreeSet<Option<&String>> = fact
        .annotations
        .iter()
        .filter_map(|a| match a {
            ScopeAnnotation::TenantScoped { column } => Some(column.as_ref()),
            _ => None,
        })
        .collect();
    let has = |wanted: &ScopeAnnotation| fact.annotations.contains(wanted);

    let tenant = if !tenant_columns.is_empty() {
        Some(ClassificationSource::Annotation)
    } else if listed(&config.tenant_tables, fact) {
        Some(ClassificationSource::Configuration)
    } else {
        None
    };
    let global = if has(&ScopeAnnotation::Global) {
        Some(ClassificationSource::Annotation)
    } else if listed(&config.global_tables, fact) {
        Some(ClassificationSource::Configuration)
    } else {
        None
    };
    let root = if has(&ScopeAnnotation::TenantRoot) {
        Some(ClassificationSource::Annotation)
    } else if listed(&config.tenant_roots, fact) {
        Some(ClassificationSource::Configuration)
    } else {
        None
    };

    let conflict = |second: &str| SchemaError::ConflictingAnnotations {
        entity: fact.entity_name.clone(),
        first: ScopeAnnotation::TenantScoped { column: None }.label().to_string(),
        second: second.to_string(),
    };

    let Some(tenant_source) = tenant else {
        return Ok(match (root, global) {
            (Some(source), _) => ExplicitLabel::Root(source),
            (None, Some(source)) => ExplicitLabel::Global(source),
            (None, None) => ExplicitLabel::Unlabelled,
        });
    };

    if global.is_some() {
        return Err(conflict(ScopeAnnotation::Global.label()));
    }
    if root.is_some() {
        return Err(conflict(ScopeAnnotation::TenantRoot.label()));
    }

    let explicit: Vec<&String> = tenant_columns.iter().flatten().copied().collect();
    if explicit.len() > 1 {
        return Err(SchemaError::ConflictingAnnotations {
            entity: fact.entity_name.clone(),
            first: format!("tenant-scoped ({})", explicit[0]),
            second: format!("tenant-scoped ({})", explicit[1]),
        });
    }

    let column = match explicit.first() {
        Some(column) => {
            if !fact.columns.is_empty() && !fact.columns.contains(*column) {
                return Err(SchemaError::UnknownScopingColumn {
                    entity: fact.entity_name.clone(),
                    column: (*column).clone(),
                });
            }
            (*column).clone()
        }
        None => conventions
            .best(&fact.columns)
            .cloned()
            .ok_or_else(|| SchemaError::MissingScopingColumn {
                entity: fact.entity_name.clone(),
                expected: conventions.describe(),
            })?,
    };

    Ok(ExplicitLabel::Tenant {
        column,
        source: tenant_source,
    })
}

fn collect_relationships(facts: &[SchemaFact]) -> Vec<Relationship> {
    let by_name: BTreeSet<&str> = facts.iter().map(|f| f.entity_name.as_str()).collect();
    let by_key: BTreeMap<&str, &str> = facts
        .iter()
        .map(|f| (f.storage_key.as_str(), f.entity_name.as_str()))
        .collect();

    facts
        .iter()
        .flat_map(|fact| {
            fact.foreign_keys.iter().filter_map(|fk| {
                let target = by_name
                    .get(fk.references.as_str())
                    .copied()
                    .or_else(|| by_key.get(fk.references.as_str()).copied());
                match target {
                    Some(to) => Some(Relationship {
                        from_entity: fact.entity_name.clone(),
                        to_entity: to.to_string(),
                        via_column: fk.column.clone(),
                    }),
                    None => {
                        tracing::warn!(
                            entity = %fact.entity_name,
                            column = %fk.column,
                            references = %fk.references,
                            "foreign key references an unknown entity; ignored"
                        );
                        None
                    }
                }
            })
        })
        .collect()
}

fn find_roots<'a>(
    labels: &BTreeMap<&'a str, ExplicitLabel>,
    relationships: &'a [Relationship],
    conventions: &ScopingConventions,
    infer: bool,
) -> BTreeMap<&'a str, ClassificationSource> {
    let mut roots: BTreeMap<&str, ClassificationSource> = labels
        .iter()
        .filter_map(|(name, label)| match label {
            ExplicitLabel::Root(source) => Some((*name, source.clone())),
            _ => None,
        })
        .collect();

    if !infer {
        return roots;
    }

    let has_scoping_fk: BTreeSet<&str> = relationships
        .iter()
        .filter(|r| conventions.matches(&r.via_column))
        .map(|r| r.from_entity.as_str())
        .collect();

    for rel in relationships
        .iter()
        .filter(|r| conventions.matches(&r.via_column))
    {
        let target = rel.to_entity.as_str();
        // An explicitly global target is the tenant table itself.
        let anchor = match labels.get(target) {
            Some(ExplicitLabel::Unlabelled) => !has_scoping_fk.contains(target),
            Some(ExplicitLabel::Global(_)) => true,
            _ => false,
        };
        if anchor {
            roots
                .entry(target)
                .or_insert(ClassificationSource::InferredRoot);
        }
    }
    roots
}

fn scoping_edges<'r>(
    relationships: &'r [Relationship],
    conventions: &'r ScopingConventions,
    from: &'r str,
) -> impl Iterator<Item = &'r Relationship> + 'r {
    relationships
        .iter()
        .filter(move |r| r.from_entity == from && conventions.matches(&r.via_column))
}

/// Entities that become tenant-scoped through a relationship, with the
/// chosen `(via_column, to_entity)`.
fn propagate<'a>(
    labels: &BTreeMap<&'a str, ExplicitLabel>,
    roots: &BTreeMap<&'a str, ClassificationSource>,
    relationships: &'a [Relationship],
    conventions: &ScopingConventions,
) -> BTreeMap<&'a str, (&'a str, &'a str)> {
    let mut anchored: BTreeSet<&str> = labels
        .iter()
        .filter(|(_, label)| matches!(label, ExplicitLabel::Tenant { .. }))
        .map(|(name, _)| *name)
        .chain(roots.keys().copied())
        .collect();

    let candidates: Vec<&str> = labels
        .iter()
        .filter(|(name, label)| {
            matches!(label, ExplicitLabel::Unlabelled) && !roots.contains_key(*name)
        })
        .map(|(name, _)| *name)
        .collect();

    let mut inferred: BTreeSet<&str> = BTreeSet::new();
    loop {
        let newly: Vec<&str> = candidates
            .iter()
            .copied()
            .filter(|c| !inferred.contains(c))
            .filter(|c| {
                scoping_edges(relationships, conventions, c)
                    .any(|r| anchored.contains(r.to_entity.as_str()))
            })
            .collect();
        if newly.is_empty() {
            break;
        }
        for name in newly {
            inferred.insert(name);
            anchored.insert(name);
        }
    }

    inferred
        .into_iter()
        .filter_map(|name| {
            relationships
                .iter()
                .filter(|r| r.from_entity == name && anchored.contains(r.to_entity.as_str()))
                .filter_map(|r| {
                    conventions
                        .priority(&r.via_column)
                        .map(|p| (p, r.via_column.as_str(), r.to_entity.as_str()))
                })
                .min()
                .map(|(_, column, to)| (name, (column, to)))
        })
        .collect()
}

/// Classify every entity in the given schema facts.
pub fn classify(facts: &[SchemaFact], config: &SchemaConfig) -> Result<ClassifiedSchema, SchemaError> {
    let facts = merge_schema_facts(facts)?;
    let conventions = ScopingConventions::new(&config.scoping_columns);

    let labels = facts
        .iter()
        .map(|f| Ok((f.entity_name.as_str(), explicit_label(f, config, &conventions)?)))
        .collect::<Result<BTreeMap<_, _>, SchemaError>>()?;

    let relationships = collect_relationships(&facts);
    let roots = find_roots(&labels, &relationships, &conventions, config.infer_roots);
    let inferred = propagate(&labels, &roots, &relationships, &conventions);

    let entities: Vec<Entity> = facts
        .iter()
        .map(|fact| {
            let name = fact.entity_name.as_str();
            let (tenant_scope, scoping_column, tenant_root, source) = match &labels[name] {
                ExplicitLabel::Tenant { column, source } => (
                    TenantScope::TenantScoped,
                    Some(column.clone()),
                    false,
                    source.clone(),
                ),
                ExplicitLabel::Global(source) => (
                    TenantScope::Global,
                    None,
                    roots.contains_key(name),
                    source.clone(),
                ),
                ExplicitLabel::Root(source) => (TenantScope::Global, None, true, source.clone()),
                ExplicitLabel::Unlabelled => {
                    if let Some(source) = roots.get(name) {
                        (TenantScope::Global, None, true, source.clone())
                    } else if let Some((column, to)) = inferred.get(name) {
                        (
                            TenantScope::TenantScoped,
                            Some(column.to_string()),
                            false,
                            ClassificationSource::Relationship {
                                via_column: column.to_string(),
                                to_entity: to.to_string(),
                            },
                        )
                    } else {
                        unresolved(fact, config.unresolved_scope, &conventions)
                    }
                }
            };

            tracing::debug!(
                entity = %name,
                scope = %tenant_scope,
                source = %source,
                "classified entity"
            );

            Entity {
                name: fact.entity_name.clone(),
                storage_key: fact.storage_key.clone(),
                tenant_scope,
                scoping_column,
                tenant_root,
                columns: fact.columns.iter().cloned().collect(),
                source,
            }
        })
        .collect();

    let schema = ClassifiedSchema::new(entities, relationships);
    tracing::info!(
        entities = schema.len(),
        tenant_scoped = schema.tenant_scoped().count(),
        "schema classified"
    );
    Ok(schema)
}

fn unresolved(
    fact: &SchemaFact,
    policy: UnresolvedScope,
    conventions: &ScopingConventions,
) -> (TenantScope, Option<String>, bool, ClassificationSource) {
    let marker = match policy {
        UnresolvedScope::MarkerColumn => conventions.best(&fact.columns),
        UnresolvedScope::Global => None,
    };
    match marker {
        Some(column) => (
            TenantScope::TenantScoped,
            Some(column.clone()),
            false,
            ClassificationSource::MarkerColumn,
        ),
        None => (
            TenantScope::Global,
            None,
            false,
            ClassificationSource::Default,
        ),
    }
}
