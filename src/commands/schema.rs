use super::load_run_config;
use crate::cli::SchemaFormat;
use crate::errors::AnalysisError;
use crate::io::output::render_schema_table;
use crate::pipeline;
use crate::report::ExitStatus;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct SchemaCommandConfig {
    pub path: PathBuf,
    pub format: SchemaFormat,
    pub config: Option<PathBuf>,
    pub plain: bool,
}

/// Classify the schema facts under `path` and print the result.
///
/// Unreadable documents are reported on stderr and make the run
/// incomplete; a schema conflict is fatal.
pub fn handle_schema(command: SchemaCommandConfig) -> Result<ExitStatus> {
    if !command.path.exists() {
        anyhow::bail!("path does not exist: {}", command.path.display());
    }
    let config = load_run_config(&command.path, command.config.as_deref())?;

    let loaded = pipeline::load_units(&command.path, &config);
    for failure in &loaded.failures {
        eprintln!(
            "warning: {} failed for {}: {}",
            failure.operation.as_str(),
            failure.path.display(),
            failure.error
        );
    }
    let schema = pipeline::classify_units(&loaded.successes, &config).map_err(AnalysisError::from)?;

    let mut out = std::io::stdout().lock();
    match command.format {
        SchemaFormat::Json => {
            serde_json::to_writer_pretty(&mut out, &schema)?;
            writeln!(out)?;
        }
        SchemaFormat::Terminal => {
            writeln!(out, "{}", render_schema_table(&schema, command.plain))?;
            writeln!(
                out,
                "{} entities, {} tenant-scoped",
                schema.len(),
                schema.tenant_scoped().count()
            )?;
        }
    }
    out.flush()?;

    Ok(if loaded.failures.is_empty() {
        ExitStatus::Clean
    } else {
        ExitStatus::Incomplete
    })
}
