use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::extraction::ProviderKind;

/// Root configuration structure for tenantguard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TenantGuardConfig {
    /// Schema classification options
    pub schema: SchemaConfig,

    /// Provider-classification table
    pub providers: ProviderConfig,

    /// Exemption sources beyond admin providers
    pub exemptions: ExemptionConfig,

    /// Suppressed findings, keyed by location and rule id
    pub suppressions: Vec<SuppressionEntry>,

    /// Run behaviour
    pub analysis: AnalysisSettings,

    /// Per-unit scan caps
    pub limits: ScanLimits,

    /// Output configuration
    pub output: OutputConfig,
}

/// How to classify an entity that has no annotation and no relationship to
/// a tenant-scoped or root entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnresolvedScope {
    /// Treat it as a global table. Misses tenant tables that only carry a
    /// scoping column without a foreign key.
    #[default]
    Global,
    /// Treat it as tenant-scoped when it has a column matching a scoping
    /// convention.
    MarkerColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Scoping-column naming conventions, highest priority first. Entries
    /// containing `*` are glob patterns.
    pub scoping_columns: Vec<String>,
    /// Entities (name or storage key) forced to tenant-scoped.
    pub tenant_tables: Vec<String>,
    /// Entities (name or storage key) forced to global.
    pub global_tables: Vec<String>,
    /// Entities (name or storage key) that are tenant roots.
    pub tenant_roots: Vec<String>,
    /// Treat the target of a scoping-column foreign key as a tenant root.
    pub infer_roots: bool,
    pub unresolved_scope: UnresolvedScope,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            scoping_columns: vec!["workspace_id".to_string()],
            tenant_tables: Vec::new(),
            global_tables: Vec::new(),
            tenant_roots: Vec::new(),
            infer_roots: true,
            unresolved_scope: UnresolvedScope::Global,
        }
    }
}

/// Maps dependency providers to the capability they supply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Providers that yield the caller's tenant context.
    pub tenant_context: Vec<String>,
    /// Providers that gate a handler to administrators.
    pub admin: Vec<String>,
    /// Explicit provider -> kind entries; these win over the lists above.
    pub mapping: BTreeMap<String, ProviderKind>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExemptionConfig {
    /// Route prefixes whose handlers are exempt, e.g. `/admin`.
    pub admin_route_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuppressionEntry {
    /// `file:line`, `file::handler`, a handler name, or a glob on the file.
    pub location: String,
    /// Rule id such as `tenant/unused-dependency`, or `*`.
    pub rule: String,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Abort on the first extraction error or unreadable document instead
    /// of reporting the unit as `Unknown`.
    pub strict: bool,
    /// Include safe access points in the report.
    pub include_safe: bool,
    /// Glob patterns; handlers and fact files matching any are skipped.
    pub ignore: Vec<String>,
    /// Worker threads, `None` or 0 for available parallelism.
    pub jobs: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanLimits {
    pub max_paths_per_operation: usize,
    pub max_nesting_depth: u32,
    pub max_operations_per_handler: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_paths_per_operation: 64,
            max_nesting_depth: 32,
            max_operations_per_handler: 256,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// `terminal`, `json` or `markdown`
    pub default_format: Option<String>,
}

impl TenantGuardConfig {
    /// Get ignore patterns from configuration
    pub fn get_ignore_patterns(&self) -> &[String] {
        &self.analysis.ignore
    }

    /// Effective worker count for the rayon pool.
    pub fn worker_count(&self) -> usize {
        match self.analysis.jobs {
            Some(n) if n > 0 => n,
            _ => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TenantGuardConfig = toml::from_str(
            r#"
[providers]
tenant_context = ["get_current_workspace"]

[limits]
max_nesting_depth = 8
"#,
        )
        .unwrap();

        assert_eq!(config.schema.scoping_columns, vec!["workspace_id"]);
        assert!(config.schema.infer_roots);
        assert_eq!(config.providers.tenant_context, vec!["get_current_workspace"]);
        assert_eq!(config.limits.max_nesting_depth, 8);
        assert_eq!(config.limits.max_paths_per_operation, 64);
    }

    #[test]
    fn test_provider_mapping_table() {
        let config: TenantGuardConfig = toml::from_str(
            r#"
[providers.mapping]
"auth.current_tenant" = "tenant_context_provider"
"auth.superuser" = "admin_provider"
"#,
        )
        .unwrap();

        assert_eq!(
            config.providers.mapping.get("auth.current_tenant"),
            Some(&ProviderKind::TenantContextProvider)
        );
        assert_eq!(
            config.providers.mapping.get("auth.superuser"),
            Some(&ProviderKind::AdminProvider)
        );
    }

    #[test]
    fn test_worker_count_honours_jobs() {
        let mut config = TenantGuardConfig::default();
        config.analysis.jobs = Some(3);
        assert_eq!(config.worker_count(), 3);
        config.analysis.jobs = Some(0);
        assert!(config.worker_count() >= 1);
    }
}
