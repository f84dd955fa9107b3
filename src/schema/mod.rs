//! Classified schema model.
//!
//! Entities are classified once per run by [`classifier::classify`] and
//! published as an immutable [`ClassifiedSchema`]. Nothing mutates an entity
//! after classification, so the schema can be shared between extraction
//! workers behind an `Arc` without locking.

pub mod classifier;

pub use classifier::{classify, merge_schema_facts, ScopingConventions};

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Reference to an entity by name.
pub type EntityRef = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantScope {
    TenantScoped,
    Global,
}

impl fmt::Display for TenantScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TenantScoped => f.write_str("tenant-scoped"),
            Self::Global => f.write_str("global"),
        }
    }
}

/// Why an entity ended up with its classification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Explicit annotation in the schema facts.
    Annotation,
    /// Listed in the configuration.
    Configuration,
    /// Foreign key to a tenant-scoped or root entity.
    Relationship { via_column: String, to_entity: String },
    /// Target of a scoping-column foreign key.
    InferredRoot,
    /// Has a scoping-convention column and `unresolved_scope = marker_column`.
    MarkerColumn,
    /// Nothing matched; fell back to global.
    Default,
}

impl fmt::Display for ClassificationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Annotation => f.write_str("annotation"),
            Self::Configuration => f.write_str("configuration"),
            Self::Relationship {
                via_column,
                to_entity,
            } => write!(f, "relationship ({via_column} -> {to_entity})"),
            Self::InferredRoot => f.write_str("inferred root"),
            Self::MarkerColumn => f.write_str("marker column"),
            Self::Default => f.write_str("default"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    pub storage_key: String,
    pub tenant_scope: TenantScope,
    /// Always set for tenant-scoped entities, never for global ones.
    pub scoping_column: Option<String>,
    /// The entity tenants are identified by, e.g. `Workspace`.
    pub tenant_root: bool,
    pub columns: BTreeSet<String>,
    pub source: ClassificationSource,
}

impl Entity {
    pub fn is_tenant_scoped(&self) -> bool {
        self.tenant_scope == TenantScope::TenantScoped
    }

    /// Whether `column` is known on this entity. An entity whose facts list
    /// no columns accepts any column.
    pub fn accepts_column(&self, column: &str) -> bool {
        self.columns.is_empty() || self.columns.contains(column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Relationship {
    pub from_entity: EntityRef,
    pub to_entity: EntityRef,
    pub via_column: String,
}

/// The result of schema classification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifiedSchema {
    entities: BTreeMap<EntityRef, Entity>,
    #[serde(skip)]
    storage_keys: BTreeMap<String, EntityRef>,
    relationships: Vec<Relationship>,
}

impl ClassifiedSchema {
    pub(crate) fn new(entities: Vec<Entity>, mut relationships: Vec<Relationship>) -> Self {
        let storage_keys = entities
            .iter()
            .map(|e| (e.storage_key.clone(), e.name.clone()))
            .collect();
        let entities = entities.into_iter().map(|e| (e.name.clone(), e)).collect();
        relationships.sort();
        relationships.dedup();
        Self {
            entities,
            storage_keys,
            relationships,
        }
    }

    /// Look up an entity by its name.
    pub fn get(&self, name: &str) -> Option<&Entity> {
        self.entities.get(name)
    }

    /// Look up an entity by name, falling back to its storage key.
    pub fn resolve(&self, name_or_key: &str) -> Option<&Entity> {
        self.entities.get(name_or_key).or_else(|| {
            self.storage_keys
                .get(name_or_key)
                .and_then(|name| self.entities.get(name))
        })
    }

    /// Entities in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    pub fn tenant_scoped(&self) -> impl Iterator<Item = &Entity> {
        self.iter().filter(|e| e.is_tenant_scoped())
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
