//! Facts supplied by the upstream source parser.
//!
//! The analyzer never parses application code itself. A language-specific
//! parser reduces models and route handlers to the structures below and
//! writes them as JSON or YAML documents, one per source file.

pub mod loader;

use serde::{Deserialize, Serialize};
use std::fmt;

/// One source unit worth of facts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FactsDocument {
    /// Source file the parser produced this document from.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub schema: Vec<SchemaFact>,
    #[serde(default)]
    pub handlers: Vec<HandlerFact>,
}

/// A persisted entity as declared in the application's models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaFact {
    pub entity_name: String,
    pub storage_key: String,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKeyFact>,
    #[serde(default, alias = "explicit_scope_annotation")]
    pub annotations: Vec<ScopeAnnotation>,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub line: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ForeignKeyFact {
    pub column: String,
    /// Entity name or storage key of the referenced entity.
    pub references: String,
    #[serde(default)]
    pub referenced_column: Option<String>,
}

/// Explicit scope annotation found on an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum ScopeAnnotation {
    TenantScoped {
        #[serde(default)]
        column: Option<String>,
    },
    Global,
    TenantRoot,
}

impl ScopeAnnotation {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TenantScoped { .. } => "tenant-scoped",
            Self::Global => "global",
            Self::TenantRoot => "tenant-root",
        }
    }
}

/// Where a handler lives. Ordering is file, then line, then handler name,
/// which is the order reports are sorted in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    #[serde(default)]
    pub line: Option<u32>,
    pub handler: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<String>,
}

impl Location {
    pub fn new(file: impl Into<String>, line: Option<u32>, handler: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            handler: handler.into(),
            route: None,
        }
    }

    /// `file:line`, or just `file` when the line is unknown.
    pub fn file_position(&self) -> String {
        match self.line {
            Some(line) => format!("{}:{}", self.file, line),
            None => self.file.clone(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file_position(), self.handler)
    }
}

/// A route handler and the data-access operations inside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HandlerFact {
    #[serde(alias = "handler_location")]
    pub location: Location,
    #[serde(default)]
    pub declared_dependencies: Vec<DependencyFact>,
    /// Local aliases, e.g. `ws_id = workspace.id`.
    #[serde(default)]
    pub bindings: Vec<BindingFact>,
    #[serde(default)]
    pub operations: Vec<OperationFact>,
}

/// An injected dependency, e.g. `workspace = Depends(get_current_workspace)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DependencyFact {
    pub name: String,
    /// Empty when the parser only supplies a kind hint.
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub provider_kind_hint: Option<crate::extraction::ProviderKind>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BindingFact {
    pub name: String,
    pub expr: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Read,
    Update,
    Delete,
    Create,
}

impl OperationKind {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Self::Read)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Create => "create",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single query/mutation discovered in a handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationFact {
    pub kind: OperationKind,
    #[serde(default)]
    pub line: Option<u32>,
    pub target_entities: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<PredicateFact>,
    #[serde(default, alias = "control_flow_summary")]
    pub control_flow: ControlFlowSummary,
}

/// A filter expression (or, for creates, a column assignment).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PredicateFact {
    /// `Entity.column` or a bare `column`.
    pub column: String,
    #[serde(default = "default_comparison")]
    pub comparison: String,
    pub rhs: RhsFact,
    #[serde(default)]
    pub joined_by: Conjunction,
    /// Branch label when the predicate is only applied on one branch.
    #[serde(default)]
    pub branch: Option<String>,
}

fn default_comparison() -> String {
    "==".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RhsFact {
    Reference { expr: String },
    Literal { value: serde_json::Value },
    Unknown,
}

/// How a predicate is combined with its siblings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

/// The parser's summary of the control flow around an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControlFlowSummary {
    /// Empty means a single straight-line path that builds and executes.
    #[serde(default)]
    pub paths: Vec<PathFact>,
    #[serde(default)]
    pub nesting_depth: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathFact {
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default = "default_true")]
    pub builds: bool,
    pub executes: bool,
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_fact_accepts_parser_field_names() {
        let json = r#"{
            "handler_location": {"file": "routes.py", "line": 26, "handler": "list_users_bad"},
            "declared_dependencies": [{"name": "db", "provider": "get_db"}],
            "operations": [{"kind": "read", "target_entities": ["User"]}]
        }"#;
        let handler: HandlerFact = serde_json::from_str(json).unwrap();

        assert_eq!(handler.location.handler, "list_users_bad");
        assert_eq!(handler.operations[0].kind, OperationKind::Read);
        assert!(handler.operations[0].control_flow.paths.is_empty());
    }

    #[test]
    fn test_control_flow_summary_alias() {
        let json = r#"{
            "kind": "delete",
            "target_entities": ["User"],
            "control_flow_summary": {"paths": [{"builds": true, "executes": false}]}
        }"#;
        let operation: OperationFact = serde_json::from_str(json).unwrap();

        assert_eq!(operation.control_flow.paths.len(), 1);
        assert!(!operation.control_flow.paths[0].executes);
    }

    #[test]
    fn test_dependency_with_only_a_kind_hint() {
        let json = r#"{"name": "workspace", "provider_kind_hint": "tenant_context_provider"}"#;
        let dependency: DependencyFact = serde_json::from_str(json).unwrap();

        assert_eq!(dependency.provider, "");
        assert_eq!(
            dependency.provider_kind_hint,
            Some(crate::extraction::ProviderKind::TenantContextProvider)
        );
    }

    #[test]
    fn test_misnamed_operation_field_is_rejected() {
        let json = r#"{"kind": "read", "target_entities": ["User"], "control_flow_sumary": {}}"#;
        let err = serde_json::from_str::<OperationFact>(json).unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_predicate_defaults() {
        let json = r#"{"column": "User.workspace_id", "rhs": {"source": "reference", "expr": "workspace.id"}}"#;
        let predicate: PredicateFact = serde_json::from_str(json).unwrap();

        assert_eq!(predicate.comparison, "==");
        assert_eq!(predicate.joined_by, Conjunction::And);
        assert_eq!(predicate.branch, None);
    }

    #[test]
    fn test_scope_annotation_tagging() {
        let yaml = "- scope: tenant_scoped\n  column: workspace_id\n- scope: global\n";
        let annotations: Vec<ScopeAnnotation> = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            annotations,
            vec![
                ScopeAnnotation::TenantScoped {
                    column: Some("workspace_id".into())
                },
                ScopeAnnotation::Global,
            ]
        );
    }

    #[test]
    fn test_location_ordering_is_file_then_line() {
        let a = Location::new("a.py", Some(40), "z");
        let b = Location::new("a.py", Some(100), "a");
        let c = Location::new("b.py", Some(1), "a");

        assert!(a < b);
        assert!(b < c);
        assert_eq!(b.to_string(), "a.py:100 (a)");
    }
}
