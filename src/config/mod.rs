//! Configuration for tenantguard.
//!
//! The config is read from `.tenantguard.toml` (searched upwards from the
//! analyzed path) or from an explicit `--config` file. Every section is
//! optional; missing values take the defaults in [`core`].

mod core;
mod loader;
pub mod validation;

pub use core::{
    AnalysisSettings, ExemptionConfig, OutputConfig, ProviderConfig, ScanLimits, SchemaConfig,
    SuppressionEntry, TenantGuardConfig, UnresolvedScope,
};
pub use loader::{
    directory_ancestors, find_config_file, load_config, load_config_from_path, parse_config_json,
    parse_config_toml, CONFIG_FILE_NAME,
};
pub use validation::validate_config;
