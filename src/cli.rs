use crate::io::OutputFormat;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tenantguard")]
#[command(about = "Static tenant-isolation checker for data-access code", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SchemaFormat {
    Terminal,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check handlers for tenant-isolation violations
    Check {
        /// Fact document or directory of fact documents
        path: PathBuf,

        /// Output format (defaults to the config's `output.default_format`, then terminal)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to the nearest .tenantguard.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Abort on the first unreadable document or unanalyzable handler
        #[arg(long)]
        strict: bool,

        /// Include safe access points in the report
        #[arg(long = "include-safe")]
        include_safe: bool,

        /// Plain output: no colors, ASCII tables
        #[arg(long, env = "TENANTGUARD_PLAIN")]
        plain: bool,

        /// Worker threads (0 = available parallelism)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Increase log verbosity (-v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Classify the schema and print every entity
    Schema {
        /// Fact document or directory of fact documents
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "terminal")]
        format: SchemaFormat,

        /// Configuration file (defaults to the nearest .tenantguard.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Plain output: no colors, ASCII tables
        #[arg(long, env = "TENANTGUARD_PLAIN")]
        plain: bool,

        /// Increase log verbosity (-v, -vv, -vvv)
        #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
        verbosity: u8,
    },

    /// Write a default .tenantguard.toml
    Init {
        /// Directory to write the configuration into
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Overwrite an existing configuration file
        #[arg(long)]
        force: bool,
    },
}

impl Commands {
    pub fn verbosity(&self) -> u8 {
        match self {
            Self::Check { verbosity, .. } | Self::Schema { verbosity, .. } => *verbosity,
            Self::Init { .. } => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_check_flags() {
        let cli = Cli::try_parse_from([
            "tenantguard",
            "check",
            "facts/",
            "--format",
            "json",
            "--strict",
            "--include-safe",
            "-j",
            "2",
            "-vv",
        ])
        .unwrap();

        match cli.command {
            Commands::Check {
                path,
                format,
                strict,
                include_safe,
                jobs,
                verbosity,
                ..
            } => {
                assert_eq!(path, PathBuf::from("facts/"));
                assert_eq!(format, Some(OutputFormat::Json));
                assert!(strict);
                assert!(include_safe);
                assert_eq!(jobs, Some(2));
                assert_eq!(verbosity, 2);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_init_defaults_to_current_dir() {
        let cli = Cli::try_parse_from(["tenantguard", "init"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Init { ref dir, force: false } if dir == &PathBuf::from(".")
        ));
    }
}
