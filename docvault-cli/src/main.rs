use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docvault::config::LoggingConfig;
use docvault::{BackupEngine, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod progress;

#[derive(Parser, Debug)]
#[command(name = "docvault")]
#[command(about = "docvault - backup and restore for document collections")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(
        short,
        long,
        global = true,
        env = "DOCVAULT_CONFIG",
        default_value = "docvault.toml"
    )]
    config: PathBuf,

    /// Log at debug level (RUST_LOG still wins)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Export every registered collection to a snapshot file
    Export {
        /// Output format: json or xlsx (default: from output extension, else json)
        #[arg(short, long)]
        format: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Restore a snapshot file into the store
    Import {
        /// Snapshot file to import
        #[arg(short, long)]
        input: PathBuf,

        /// Input format: json or xlsx (default: from input extension)
        #[arg(short, long)]
        format: Option<String>,

        /// Write the import outcome as JSON to this file
        #[arg(long)]
        report: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Decode a snapshot file and summarize it without importing
    Inspect {
        /// Snapshot file to inspect
        #[arg(short, long)]
        input: PathBuf,

        /// Input format: json or xlsx (default: from input extension)
        #[arg(short, long)]
        format: Option<String>,
    },

    /// List registered collections in restore order
    Collections,

    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Commands::InitConfig { force } = cli.command {
        init_logging(&LoggingConfig::default(), cli.verbose);
        return commands::run_init_config(&cli.config, force);
    }

    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {}", cli.config.display()))?;
    init_logging(&config.logging, cli.verbose);
    tracing::debug!("Config file: {}", cli.config.display());

    let (engine, _store) = BackupEngine::open(&config)
        .await
        .context("Failed to open document store")?;

    match cli.command {
        Commands::Export {
            format,
            output,
            no_progress,
        } => {
            commands::run_export(&engine, format.as_deref(), output.as_deref(), no_progress).await
        }
        Commands::Import {
            input,
            format,
            report,
            no_progress,
        } => {
            commands::run_import(
                &engine,
                &input,
                format.as_deref(),
                report.as_deref(),
                no_progress,
            )
            .await
        }
        Commands::Inspect { input, format } => {
            commands::run_inspect(&engine, &input, format.as_deref())
        }
        Commands::Collections => {
            commands::run_collections(&engine);
            Ok(())
        }
        Commands::InitConfig { .. } => Ok(()),
    }
}

/// Logs go to stderr so `export` can stream the snapshot to stdout.
fn init_logging(logging: &LoggingConfig, verbose: bool) {
    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) if verbose => EnvFilter::new("debug"),
        Err(_) => EnvFilter::new(&logging.level),
    };

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_export() {
        let cli = Cli::try_parse_from([
            "docvault", "export", "--format", "xlsx", "-o", "backup.xlsx",
        ])
        .unwrap();
        match cli.command {
            Commands::Export {
                format,
                output,
                no_progress,
            } => {
                assert_eq!(format.as_deref(), Some("xlsx"));
                assert_eq!(output, Some(PathBuf::from("backup.xlsx")));
                assert!(!no_progress);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_import_with_global_flags() {
        let cli = Cli::try_parse_from([
            "docvault",
            "import",
            "-i",
            "backup.json",
            "--report",
            "outcome.json",
            "-v",
            "--config",
            "/etc/docvault.toml",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.config, PathBuf::from("/etc/docvault.toml"));
        assert!(matches!(
            cli.command,
            Commands::Import { ref report, .. } if report.as_deref() == Some(std::path::Path::new("outcome.json"))
        ));
    }

    #[test]
    fn test_import_requires_input() {
        assert!(Cli::try_parse_from(["docvault", "import"]).is_err());
    }

    #[test]
    fn test_parse_init_config() {
        let cli = Cli::try_parse_from(["docvault", "init-config", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::InitConfig { force: true }));
    }
}
