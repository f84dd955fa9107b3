//! The reference multi-tenant application used across the test suite.
//!
//! Five models (`Workspace` as the tenant root, tenant-scoped `User` and
//! `Project`, global `FeatureFlag`, and `AuditLog` which carries a
//! `workspace_id` column without a foreign key) and eleven route handlers
//! covering every verdict.

use super::builders::{HandlerFactBuilder, OperationFactBuilder, SchemaFactBuilder};
use crate::config::TenantGuardConfig;
use crate::facts::loader::SourceUnit;
use crate::facts::{FactsDocument, HandlerFact, SchemaFact};

pub const MODELS_FILE: &str = "models.py";
pub const ROUTES_FILE: &str = "routes.py";

pub fn fixture_schema() -> Vec<SchemaFact> {
    vec![
        SchemaFactBuilder::new("Workspace", "workspaces")
            .columns(&["id", "name", "slug"])
            .declared_at(MODELS_FILE, 7)
            .build(),
        SchemaFactBuilder::new("User", "users")
            .columns(&["id", "workspace_id", "email", "name"])
            .foreign_key("workspace_id", "workspaces")
            .declared_at(MODELS_FILE, 15)
            .build(),
        SchemaFactBuilder::new("Project", "projects")
            .columns(&["id", "workspace_id", "name", "description"])
            .foreign_key("workspace_id", "workspaces")
            .declared_at(MODELS_FILE, 27)
            .build(),
        SchemaFactBuilder::new("FeatureFlag", "feature_flags")
            .columns(&["id", "key", "enabled", "description"])
            .declared_at(MODELS_FILE, 39)
            .build(),
        SchemaFactBuilder::new("AuditLog", "audit_logs")
            .columns(&["id", "action", "user_id", "workspace_id", "details"])
            .declared_at(MODELS_FILE, 49)
            .build(),
    ]
}

/// Defaults plus the fixture's providers and the `/admin` route prefix.
pub fn fixture_config() -> TenantGuardConfig {
    let mut config = TenantGuardConfig::default();
    config.providers.tenant_context = vec!["get_current_workspace".to_string()];
    config.providers.admin = vec!["require_admin".to_string()];
    config.exemptions.admin_route_prefixes = vec!["/admin".to_string()];
    config
}

fn handler(line: u32, name: &str, route: &str) -> HandlerFactBuilder {
    HandlerFactBuilder::new(ROUTES_FILE, line, name)
        .route(route)
        .dependency("db", "get_db")
}

fn scoped(builder: HandlerFactBuilder) -> HandlerFactBuilder {
    builder.dependency("workspace", "get_current_workspace")
}

pub fn fixture_handlers() -> Vec<HandlerFact> {
    vec![
        handler(26, "list_users_bad", "/users")
            .operation(OperationFactBuilder::read(&["User"]).line(28).build())
            .build(),
        scoped(handler(34, "list_users_good", "/users/safe"))
            .operation(
                OperationFactBuilder::read(&["User"])
                    .line(39)
                    .filter("User.workspace_id", "workspace.id")
                    .build(),
            )
            .build(),
        handler(45, "list_projects_no_auth", "/projects")
            .operation(OperationFactBuilder::read(&["Project"]).line(47).build())
            .build(),
        scoped(handler(53, "list_projects_missing_filter", "/projects/missing-filter"))
            .operation(OperationFactBuilder::read(&["Project"]).line(58).build())
            .build(),
        scoped(handler(64, "list_projects_safe", "/projects/safe"))
            .operation(
                OperationFactBuilder::read(&["Project"])
                    .line(69)
                    .filter("Project.workspace_id", "workspace.id")
                    .build(),
            )
            .build(),
        scoped(handler(75, "update_project_bad", "/projects/{project_id}"))
            .operation(
                OperationFactBuilder::update(&["Project"])
                    .line(81)
                    .filter("Project.id", "project_id")
                    .build(),
            )
            .build(),
        scoped(handler(88, "update_project_safe", "/projects/{project_id}/safe"))
            .operation(
                OperationFactBuilder::update(&["Project"])
                    .line(94)
                    .filter("Project.id", "project_id")
                    .filter("Project.workspace_id", "workspace.id")
                    .build(),
            )
            .build(),
        handler(104, "list_feature_flags", "/feature-flags")
            .operation(OperationFactBuilder::read(&["FeatureFlag"]).line(106).build())
            .build(),
        handler(112, "admin_list_all_users", "/admin/all-users")
            .dependency("_admin", "require_admin")
            .operation(OperationFactBuilder::read(&["User"]).line(117).build())
            .build(),
        handler(123, "delete_user_bad", "/users/{user_id}")
            .operation(
                OperationFactBuilder::delete(&["User"])
                    .line(128)
                    .filter("User.id", "user_id")
                    .build(),
            )
            .build(),
        scoped(handler(135, "delete_user_safe", "/users/{user_id}/safe"))
            .operation(
                OperationFactBuilder::delete(&["User"])
                    .line(141)
                    .filter("User.id", "user_id")
                    .filter("User.workspace_id", "workspace.id")
                    .build(),
            )
            .build(),
    ]
}

/// The fixture application as the parser would emit it: one document per
/// source file.
pub fn fixture_units() -> Vec<SourceUnit> {
    vec![
        SourceUnit::new(
            "facts/models.json",
            FactsDocument {
                source: Some(MODELS_FILE.to_string()),
                schema: fixture_schema(),
                handlers: Vec::new(),
            },
        ),
        SourceUnit::new(
            "facts/routes.json",
            FactsDocument {
                source: Some(ROUTES_FILE.to_string()),
                schema: Vec::new(),
                handlers: fixture_handlers(),
            },
        ),
    ]
}

/// Both documents merged into one.
pub fn fixture_document() -> FactsDocument {
    FactsDocument {
        source: None,
        schema: fixture_schema(),
        handlers: fixture_handlers(),
    }
}
