use super::load_run_config;
use crate::config::TenantGuardConfig;
use crate::formatting::{ColorMode, FormattingConfig};
use crate::io::{create_writer, OutputFormat};
use crate::observability::{set_phase, AnalysisPhase};
use crate::pipeline;
use crate::report::{ExitStatus, Report};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    pub path: PathBuf,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub strict: bool,
    pub include_safe: bool,
    pub plain: bool,
    pub jobs: Option<usize>,
}

pub fn handle_check(check: CheckConfig) -> Result<ExitStatus> {
    if !check.path.exists() {
        anyhow::bail!("path does not exist: {}", check.path.display());
    }

    let mut config = load_run_config(&check.path, check.config.as_deref())?;
    apply_overrides(&mut config, &check);
    let format = resolve_format(check.format, &config);

    let report = pipeline::run(&check.path, &config)?;

    let _phase = set_phase(AnalysisPhase::OutputGeneration);
    let formatting = formatting_for(check.plain, check.output.as_deref());
    write_report(&report, format, check.output.as_deref(), formatting)?;

    Ok(report.exit_status())
}

/// Command-line flags only ever switch behaviour on; they never turn off
/// something the config file enabled.
fn apply_overrides(config: &mut TenantGuardConfig, check: &CheckConfig) {
    config.analysis.strict |= check.strict;
    config.analysis.include_safe |= check.include_safe;
    if check.jobs.is_some() {
        config.analysis.jobs = check.jobs;
    }
}

/// Flag first, then `output.default_format`, then terminal. The config
/// value was validated when it was loaded.
fn resolve_format(flag: Option<OutputFormat>, config: &TenantGuardConfig) -> OutputFormat {
    flag.or_else(|| {
        config
            .output
            .default_format
            .as_deref()
            .and_then(OutputFormat::parse)
    })
    .unwrap_or(OutputFormat::Terminal)
}

fn formatting_for(plain: bool, output: Option<&Path>) -> FormattingConfig {
    let mut formatting = if plain {
        FormattingConfig::plain()
    } else {
        FormattingConfig::from_env()
    };
    if output.is_some() {
        formatting.color = ColorMode::Never;
    }
    formatting.apply();
    formatting
}

fn write_report(
    report: &Report,
    format: OutputFormat,
    output: Option<&Path>,
    formatting: FormattingConfig,
) -> Result<()> {
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                crate::io::ensure_dir(parent)?;
            }
            let file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(std::io::stdout().lock()),
    };
    create_writer(format, writer, formatting).write_report(report)?;
    if let Some(path) = output {
        tracing::info!(path = %path.display(), "report written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_switch_on_but_never_off() {
        let mut config = TenantGuardConfig::default();
        config.analysis.include_safe = true;
        let check = CheckConfig {
            strict: true,
            jobs: Some(3),
            ..CheckConfig::default()
        };

        apply_overrides(&mut config, &check);
        assert!(config.analysis.strict);
        assert!(config.analysis.include_safe);
        assert_eq!(config.analysis.jobs, Some(3));
    }

    #[test]
    fn test_format_resolution_order() {
        let mut config = TenantGuardConfig::default();
        assert_eq!(resolve_format(None, &config), OutputFormat::Terminal);

        config.output.default_format = Some("json".into());
        assert_eq!(resolve_format(None, &config), OutputFormat::Json);
        assert_eq!(
            resolve_format(Some(OutputFormat::Markdown), &config),
            OutputFormat::Markdown
        );
    }

    #[test]
    fn test_missing_path_is_an_error() {
        let check = CheckConfig {
            path: PathBuf::from("/definitely/not/here"),
            ..CheckConfig::default()
        };
        assert!(handle_check(check).is_err());
    }
}
