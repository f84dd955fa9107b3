use crate::config::CONFIG_FILE_NAME;
use crate::io;
use anyhow::Result;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG: &str = r#"# tenantguard configuration

[schema]
# Column names that scope a row to a tenant, highest priority first.
# Entries containing `*` are glob patterns.
scoping_columns = ["workspace_id"]
# Entities (name or table) forced to a classification.
tenant_tables = []
global_tables = []
tenant_roots = []
# Treat the target of a scoping-column foreign key as a tenant root.
infer_roots = true
# Entities with no annotation or relationship: "global" or "marker_column".
unresolved_scope = "global"

[providers]
# Dependencies that yield the caller's tenant context.
tenant_context = ["get_current_workspace"]
# Dependencies that restrict a handler to administrators.
admin = ["require_admin"]

[providers.mapping]
# "auth.deps.current_org" = "tenant_context_provider"

[exemptions]
admin_route_prefixes = ["/admin"]

[analysis]
strict = false
include_safe = false
ignore = ["tests/**"]

[limits]
max_paths_per_operation = 64
max_nesting_depth = 32
max_operations_per_handler = 256

[output]
default_format = "terminal"

# [[suppressions]]
# location = "app/routes.py::list_public_projects"
# rule = "tenant/unused-dependency"
# reason = "projects listed here are public"
"#;

/// Write the default configuration into `dir`, returning its path.
pub fn init_config(dir: &Path, force: bool) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    io::write_file(&config_path, DEFAULT_CONFIG)?;
    tracing::info!(path = %config_path.display(), "wrote default configuration");
    Ok(config_path)
}
