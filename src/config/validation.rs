//! Validation with error accumulation for configuration.
//!
//! Every check runs, so a user sees all configuration problems in a single
//! run instead of fixing them one at a time.

use super::core::TenantGuardConfig;
use crate::errors::ConfigError;
use crate::io::OutputFormat;
use crate::isolation::ViolationKind;
use std::collections::BTreeSet;

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &TenantGuardConfig) -> Result<(), Vec<ConfigError>> {
    let errors: Vec<ConfigError> = [
        validate_scoping_columns(config),
        validate_patterns(config),
        validate_providers(config),
        validate_limits(config),
        validate_suppressions(config),
        validate_output(config),
    ]
    .into_iter()
    .flatten()
    .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_scoping_columns(config: &TenantGuardConfig) -> Vec<ConfigError> {
    let columns = &config.schema.scoping_columns;
    let mut errors = Vec::new();
    if columns.is_empty() {
        errors.push(ConfigError::invalid(
            "schema.scoping_columns",
            "at least one scoping column convention is required",
        ));
    }
    if columns.iter().any(|c| c.trim().is_empty()) {
        errors.push(ConfigError::invalid(
            "schema.scoping_columns",
            "scoping column names must not be empty",
        ));
    }
    errors
}

fn validate_patterns(config: &TenantGuardConfig) -> Vec<ConfigError> {
    let globbed_columns = config
        .schema
        .scoping_columns
        .iter()
        .filter(|c| c.contains('*'));
    let suppression_globs = config
        .suppressions
        .iter()
        .map(|s| &s.location)
        .filter(|l| l.contains(['*', '?', '[']));

    config
        .analysis
        .ignore
        .iter()
        .chain(globbed_columns)
        .chain(suppression_globs)
        .filter_map(|pattern| {
            glob::Pattern::new(pattern)
                .err()
                .map(|e| ConfigError::InvalidPattern {
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })
        })
        .collect()
}

fn validate_providers(config: &TenantGuardConfig) -> Vec<ConfigError> {
    let tenant: BTreeSet<&String> = config.providers.tenant_context.iter().collect();
    config
        .providers
        .admin
        .iter()
        .filter(|p| tenant.contains(p))
        .map(|p| {
            ConfigError::invalid(
                "providers",
                format!("provider `{p}` is listed as both tenant_context and admin"),
            )
        })
        .collect()
}

fn validate_limits(config: &TenantGuardConfig) -> Vec<ConfigError> {
    let limits = &config.limits;
    let mut errors = Vec::new();
    if limits.max_paths_per_operation == 0 {
        errors.push(ConfigError::invalid(
            "limits.max_paths_per_operation",
            "must be greater than 0",
        ));
    }
    if limits.max_nesting_depth == 0 {
        errors.push(ConfigError::invalid(
            "limits.max_nesting_depth",
            "must be greater than 0",
        ));
    }
    if limits.max_operations_per_handler == 0 {
        errors.push(ConfigError::invalid(
            "limits.max_operations_per_handler",
            "must be greater than 0",
        ));
    }
    errors
}

fn validate_suppressions(config: &TenantGuardConfig) -> Vec<ConfigError> {
    config
        .suppressions
        .iter()
        .enumerate()
        .flat_map(|(i, entry)| {
            let mut errors = Vec::new();
            if entry.location.trim().is_empty() {
                errors.push(ConfigError::invalid(
                    format!("suppressions[{i}].location"),
                    "location must not be empty",
                ));
            }
            let known = ViolationKind::ALL.iter().any(|k| k.rule_id() == entry.rule);
            if entry.rule != "*" && !known {
                errors.push(ConfigError::invalid(
                    format!("suppressions[{i}].rule"),
                    format!(
                        "unknown rule `{}` (expected `*` or one of: {})",
                        entry.rule,
                        ViolationKind::ALL
                            .iter()
                            .map(|k| k.rule_id())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                ));
            }
            errors
        })
        .collect()
}

fn validate_output(config: &TenantGuardConfig) -> Vec<ConfigError> {
    match &config.output.default_format {
        Some(format) if OutputFormat::parse(format).is_none() => vec![ConfigError::invalid(
            "output.default_format",
            format!("unknown format `{format}` (expected terminal, json or markdown)"),
        )],
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SuppressionEntry;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TenantGuardConfig::default()).is_ok());
    }

    #[test]
    fn test_accumulates_all_errors() {
        let mut config = TenantGuardConfig::default();
        config.schema.scoping_columns.clear();
        config.limits.max_nesting_depth = 0;
        config.providers.tenant_context = vec!["get_ctx".into()];
        config.providers.admin = vec!["get_ctx".into()];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_rejects_invalid_ignore_glob() {
        let mut config = TenantGuardConfig::default();
        config.analysis.ignore = vec!["[unclosed".into()];

        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ConfigError::InvalidPattern { .. }));
    }

    #[test]
    fn test_rejects_unknown_suppression_rule() {
        let mut config = TenantGuardConfig::default();
        config.suppressions = vec![
            SuppressionEntry {
                location: "routes.py:40".into(),
                rule: "tenant/unused-dependency".into(),
                reason: None,
            },
            SuppressionEntry {
                location: "routes.py".into(),
                rule: "tenant/made-up".into(),
                reason: None,
            },
        ];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("suppressions[1].rule"));
    }

    #[test]
    fn test_rejects_unknown_default_format() {
        let mut config = TenantGuardConfig::default();
        config.output.default_format = Some("html".into());

        let errors = validate_config(&config).unwrap_err();
        assert!(errors[0].to_string().contains("output.default_format"));

        config.output.default_format = Some("markdown".into());
        assert!(validate_config(&config).is_ok());
    }
}
