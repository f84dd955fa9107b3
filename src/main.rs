use anyhow::Result;
use clap::Parser;
use tenantguard::cli::{Cli, Commands};
use tenantguard::commands::{self, CheckConfig, SchemaCommandConfig};
use tenantguard::errors::AnalysisError;
use tenantguard::observability;
use tenantguard::report::ExitStatus;

fn main() {
    let cli = Cli::parse();
    observability::init_tracing(cli.command.verbosity());
    observability::install_panic_hook();

    let status = match run_command(cli.command) {
        Ok(status) => status,
        Err(e) => {
            report_error(&e);
            ExitStatus::Fatal
        }
    };
    std::process::exit(status.code());
}

fn run_command(command: Commands) -> Result<ExitStatus> {
    match command {
        Commands::Check {
            path,
            format,
            output,
            config,
            strict,
            include_safe,
            plain,
            jobs,
            verbosity: _,
        } => commands::handle_check(CheckConfig {
            path,
            format,
            output,
            config,
            strict,
            include_safe,
            plain,
            jobs,
        }),
        Commands::Schema {
            path,
            format,
            config,
            plain,
            verbosity: _,
        } => commands::handle_schema(SchemaCommandConfig {
            path,
            format,
            config,
            plain,
        }),
        Commands::Init { dir, force } => {
            let path = commands::init_config(&dir, force)?;
            println!("Created {}", path.display());
            Ok(ExitStatus::Clean)
        }
    }
}

fn report_error(error: &anyhow::Error) {
    match error.downcast_ref::<AnalysisError>() {
        Some(e) => eprintln!("error[{}]: {}", e.code(), e),
        None => eprintln!("error: {error:#}"),
    }
}
