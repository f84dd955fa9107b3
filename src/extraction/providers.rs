//! Provider-classification table.
//!
//! Dependency-injection styles vary by framework, so a provider's kind is
//! looked up in a table built from configuration rather than guessed from
//! its name.

use super::ProviderKind;
use crate::config::ProviderConfig;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderTable {
    entries: BTreeMap<String, ProviderKind>,
}

impl ProviderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the table from configuration. Explicit `mapping` entries take
    /// precedence over the `tenant_context` and `admin` lists.
    pub fn from_config(config: &ProviderConfig) -> Self {
        let mut table = Self::new();
        for provider in &config.tenant_context {
            table.insert(provider, ProviderKind::TenantContextProvider);
        }
        for provider in &config.admin {
            table.insert(provider, ProviderKind::AdminProvider);
        }
        for (provider, kind) in &config.mapping {
            table.insert(provider, *kind);
        }
        table
    }

    pub fn insert(&mut self, provider: &str, kind: ProviderKind) {
        self.entries.insert(provider.to_string(), kind);
    }

    /// Classify a provider identifier such as `get_current_workspace` or
    /// `app.auth.get_current_workspace`.
    ///
    /// Looks up the full identifier, then its last dotted segment, then
    /// falls back to the parser's hint.
    pub fn classify(&self, provider: &str, hint: Option<ProviderKind>) -> ProviderKind {
        let provider = provider.trim();
        self.entries
            .get(provider)
            .or_else(|| {
                provider
                    .rsplit_once('.')
                    .and_then(|(_, last)| self.entries.get(last))
            })
            .copied()
            .or(hint)
            .unwrap_or(ProviderKind::Other)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> ProviderTable {
        let mut config = ProviderConfig::default();
        config.tenant_context = vec!["get_current_workspace".into()];
        config.admin = vec!["require_admin".into()];
        config
            .mapping
            .insert("require_admin".into(), ProviderKind::TenantContextProvider);
        ProviderTable::from_config(&config)
    }

    #[test]
    fn test_lookup_by_full_identifier_and_last_segment() {
        let table = table();
        assert_eq!(
            table.classify("get_current_workspace", None),
            ProviderKind::TenantContextProvider
        );
        assert_eq!(
            table.classify("app.deps.get_current_workspace", None),
            ProviderKind::TenantContextProvider
        );
        assert_eq!(table.classify("get_db", None), ProviderKind::Other);
    }

    #[test]
    fn test_mapping_overrides_lists() {
        assert_eq!(
            table().classify("require_admin", None),
            ProviderKind::TenantContextProvider
        );
    }

    #[test]
    fn test_hint_is_used_only_when_unmapped() {
        let table = table();
        assert_eq!(
            table.classify("is_superuser", Some(ProviderKind::AdminProvider)),
            ProviderKind::AdminProvider
        );
        assert_eq!(
            table.classify("get_current_workspace", Some(ProviderKind::Other)),
            ProviderKind::TenantContextProvider
        );
    }
}
