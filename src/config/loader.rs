use std::fs;
use std::path::{Path, PathBuf};

use super::core::TenantGuardConfig;
use super::validation::validate_config;
use crate::errors::ConfigError;

pub const CONFIG_FILE_NAME: &str = ".tenantguard.toml";
const MAX_TRAVERSAL_DEPTH: usize = 10;

/// Parse a configuration from TOML text.
pub fn parse_config_toml(contents: &str, path: &Path) -> Result<TenantGuardConfig, ConfigError> {
    toml::from_str::<TenantGuardConfig>(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Parse a configuration from JSON text.
pub fn parse_config_json(contents: &str, path: &Path) -> Result<TenantGuardConfig, ConfigError> {
    serde_json::from_str::<TenantGuardConfig>(contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Load and validate a configuration file. `.json` files are parsed as
/// JSON, everything else as TOML.
pub fn load_config_from_path(path: &Path) -> Result<TenantGuardConfig, Vec<ConfigError>> {
    let contents = fs::read_to_string(path).map_err(|source| {
        vec![ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }]
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_config_json(&contents, path),
        _ => parse_config_toml(&contents, path),
    }
    .map_err(|e| vec![e])?;

    validate_config(&config)?;
    tracing::debug!(path = %path.display(), "loaded configuration");
    Ok(config)
}

/// Generate `start` and its ancestors, at most `max_depth` directories.
pub fn directory_ancestors(start: PathBuf, max_depth: usize) -> impl Iterator<Item = PathBuf> {
    std::iter::successors(Some(start), |dir| {
        let mut parent = dir.clone();
        if parent.pop() {
            Some(parent)
        } else {
            None
        }
    })
    .take(max_depth)
}

/// Find the nearest `.tenantguard.toml` at or above `start`.
pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    directory_ancestors(start.to_path_buf(), MAX_TRAVERSAL_DEPTH)
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// Resolve the configuration for a run.
///
/// An explicit path must exist. Otherwise the nearest `.tenantguard.toml`
/// above `start` is used, falling back to defaults when none is found. A
/// config that exists but does not parse or validate is always an error.
pub fn load_config(
    explicit: Option<&Path>,
    start: &Path,
) -> Result<TenantGuardConfig, Vec<ConfigError>> {
    if let Some(path) = explicit {
        return load_config_from_path(path);
    }

    match find_config_file(start) {
        Some(path) => load_config_from_path(&path),
        None => {
            tracing::debug!(
                "No config found after checking {} directories. Using default config.",
                MAX_TRAVERSAL_DEPTH
            );
            let config = TenantGuardConfig::default();
            validate_config(&config)?;
            Ok(config)
        }
    }
}
