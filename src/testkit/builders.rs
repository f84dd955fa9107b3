//! Fluent builders for fact structures.
//!
//! ```rust,ignore
//! use tenantguard::testkit::{HandlerFactBuilder, OperationFactBuilder};
//!
//! let handler = HandlerFactBuilder::new("routes.py", 34, "list_users_good")
//!     .route("/users/safe")
//!     .dependency("workspace", "get_current_workspace")
//!     .operation(
//!         OperationFactBuilder::read(&["User"])
//!             .filter("User.workspace_id", "workspace.id")
//!             .build(),
//!     )
//!     .build();
//! ```

use crate::facts::{
    BindingFact, Conjunction, ControlFlowSummary, DependencyFact, ForeignKeyFact, HandlerFact,
    Location, OperationFact, OperationKind, PathFact, PredicateFact, RhsFact, ScopeAnnotation,
    SchemaFact,
};

#[derive(Debug, Clone)]
pub struct SchemaFactBuilder {
    fact: SchemaFact,
}

impl SchemaFactBuilder {
    pub fn new(entity_name: &str, storage_key: &str) -> Self {
        Self {
            fact: SchemaFact {
                entity_name: entity_name.to_string(),
                storage_key: storage_key.to_string(),
                columns: Vec::new(),
                foreign_keys: Vec::new(),
                annotations: Vec::new(),
                file: None,
                line: None,
            },
        }
    }

    pub fn columns(mut self, columns: &[&str]) -> Self {
        self.fact
            .columns
            .extend(columns.iter().map(|c| c.to_string()));
        self
    }

    /// `column: references` where `references` is an entity name or
    /// storage key.
    pub fn foreign_key(mut self, column: &str, references: &str) -> Self {
        self.fact.foreign_keys.push(ForeignKeyFact {
            column: column.to_string(),
            references: references.to_string(),
            referenced_column: Some("id".to_string()),
        });
        self
    }

    pub fn tenant_scoped(self, column: Option<&str>) -> Self {
        self.annotate(ScopeAnnotation::TenantScoped {
            column: column.map(str::to_string),
        })
    }

    pub fn annotate(mut self, annotation: ScopeAnnotation) -> Self {
        self.fact.annotations.push(annotation);
        self
    }

    pub fn declared_at(mut self, file: &str, line: u32) -> Self {
        self.fact.file = Some(file.to_string());
        self.fact.line = Some(line);
        self
    }

    pub fn build(self) -> SchemaFact {
        self.fact
    }
}

#[derive(Debug, Clone)]
pub struct HandlerFactBuilder {
    handler: HandlerFact,
}

impl HandlerFactBuilder {
    pub fn new(file: &str, line: u32, handler: &str) -> Self {
        Self {
            handler: HandlerFact {
                location: Location::new(file, Some(line), handler),
                declared_dependencies: Vec::new(),
                bindings: Vec::new(),
                operations: Vec::new(),
            },
        }
    }

    pub fn route(mut self, route: &str) -> Self {
        self.handler.location.route = Some(route.to_string());
        self
    }

    pub fn dependency(mut self, name: &str, provider: &str) -> Self {
        self.handler.declared_dependencies.push(DependencyFact {
            name: name.to_string(),
            provider: provider.to_string(),
            provider_kind_hint: None,
        });
        self
    }

    /// `name = expr` inside the handler body.
    pub fn binding(mut self, name: &str, expr: &str) -> Self {
        self.handler.bindings.push(BindingFact {
            name: name.to_string(),
            expr: expr.to_string(),
        });
        self
    }

    pub fn operation(mut self, operation: OperationFact) -> Self {
        self.handler.operations.push(operation);
        self
    }

    pub fn build(self) -> HandlerFact {
        self.handler
    }
}

#[derive(Debug, Clone)]
pub struct OperationFactBuilder {
    operation: OperationFact,
}

impl OperationFactBuilder {
    pub fn new(kind: OperationKind, targets: &[&str]) -> Self {
        Self {
            operation: OperationFact {
                kind,
                line: None,
                target_entities: targets.iter().map(|t| t.to_string()).collect(),
                predicates: Vec::new(),
                control_flow: ControlFlowSummary::default(),
            },
        }
    }

    pub fn read(targets: &[&str]) -> Self {
        Self::new(OperationKind::Read, targets)
    }

    pub fn update(targets: &[&str]) -> Self {
        Self::new(OperationKind::Update, targets)
    }

    pub fn delete(targets: &[&str]) -> Self {
        Self::new(OperationKind::Delete, targets)
    }

    pub fn create(targets: &[&str]) -> Self {
        Self::new(OperationKind::Create, targets)
    }

    /// `column == expr`, AND-joined, on every path.
    pub fn filter(self, column: &str, expr: &str) -> Self {
        self.predicate(PredicateFact {
            column: column.to_string(),
            comparison: "==".to_string(),
            rhs: RhsFact::Reference {
                expr: expr.to_string(),
            },
            joined_by: Conjunction::And,
            branch: None,
        })
    }

    pub fn filter_literal(self, column: &str, value: serde_json::Value) -> Self {
        self.predicate(PredicateFact {
            column: column.to_string(),
            comparison: "==".to_string(),
            rhs: RhsFact::Literal { value },
            joined_by: Conjunction::And,
            branch: None,
        })
    }

    /// Like [`filter`](Self::filter) but only applied on `branch`.
    pub fn filter_on_branch(self, column: &str, expr: &str, branch: &str) -> Self {
        self.predicate(PredicateFact {
            column: column.to_string(),
            comparison: "==".to_string(),
            rhs: RhsFact::Reference {
                expr: expr.to_string(),
            },
            joined_by: Conjunction::And,
            branch: Some(branch.to_string()),
        })
    }

    pub fn predicate(mut self, predicate: PredicateFact) -> Self {
        self.operation.predicates.push(predicate);
        self
    }

    pub fn line(mut self, line: u32) -> Self {
        self.operation.line = Some(line);
        self
    }

    /// Branches that build and execute the operation.
    pub fn branches(mut self, branches: &[&str]) -> Self {
        self.operation.control_flow.paths = branches
            .iter()
            .map(|b| PathFact {
                branch: Some(b.to_string()),
                builds: true,
                executes: true,
            })
            .collect();
        self
    }

    pub fn paths(mut self, paths: Vec<PathFact>) -> Self {
        self.operation.control_flow.paths = paths;
        self
    }

    pub fn nesting_depth(mut self, depth: u32) -> Self {
        self.operation.control_flow.nesting_depth = depth;
        self
    }

    pub fn build(self) -> OperationFact {
        self.operation
    }
}
