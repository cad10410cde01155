//! Chat archiver CLI
//!
//! Local and scheduled-job entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use archiver::{
    config::{load_config, resolve_token},
    error::{AppError, Result},
    models::{Config, SyncState},
    pipeline,
    services::CliExporter,
    storage::StateStore,
};
use clap::{Parser, Subcommand};

/// Archive chat channels into a browsable static site
#[derive(Parser, Debug)]
#[command(name = "archiver", version, about = "Incremental chat channel archiver")]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Capture new messages for every configured server
    Sync,

    /// Move raw captures into the dated public layout
    Organize {
        /// Remove raw files once organized
        #[arg(long)]
        cleanup: bool,
    },

    /// Rebuild the navigation pages
    Navigate,

    /// Run full pipeline: Sync → Organize → Navigate
    Pipeline {
        /// Skip capturing, only rebuild the site from existing exports
        #[arg(long)]
        skip_sync: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show paths and sync state info
    Info,

    /// Combine two sync state files, keeping the newer record per unit
    MergeState {
        #[arg(long)]
        ours: PathBuf,

        #[arg(long)]
        theirs: PathBuf,

        /// Output file (default: overwrite --ours)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, config_path: &Path) {
    let level = if verbose {
        "debug".to_string()
    } else {
        Config::load(config_path)
            .map(|c| c.logging.level)
            .unwrap_or_else(|_| "info".to_string())
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn exporter_for(config: &Config) -> Result<CliExporter> {
    let token = resolve_token(&config.capture)?;
    Ok(CliExporter::new(&config.capture, &config.export, token))
}

/// Exit status for an error that escaped a command.
///
/// Fatal errors (configuration, credentials) stop before any channel is
/// touched and exit with 2; anything else that ends a stage exits with 1,
/// the same as a run with failed units.
fn exit_status(err: &AppError) -> u8 {
    if err.is_fatal() { 2 } else { 1 }
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, &cli.config);

    log::info!("Archiver starting...");

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            if e.is_fatal() {
                log::error!("Fatal: {e}");
            } else {
                log::error!("Stage failed: {e}");
            }
            ExitCode::from(exit_status(&e))
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Command::Sync => {
            let config = load_config(&cli.config)?;
            let exporter = exporter_for(&config)?;
            let summary = pipeline::run_sync(&config, &exporter).await?;
            log::debug!("{}", serde_json::to_string_pretty(&summary)?);

            if summary.units_failed > 0 {
                log::error!("{} units failed to sync", summary.units_failed);
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Organize { cleanup } => {
            let config = load_config(&cli.config)?;
            let stats = pipeline::run_organize(&config, cleanup)?;
            for error in &stats.errors {
                log::warn!("{error}");
            }
        }

        Command::Navigate => {
            let config = load_config(&cli.config)?;
            pipeline::run_navigation(&config)?;
        }

        Command::Pipeline { skip_sync } => {
            let config = load_config(&cli.config)?;
            let report = if skip_sync {
                log::info!("Skipping sync, using existing exports...");
                pipeline::run_pipeline(&config, None).await?
            } else {
                let exporter = exporter_for(&config)?;
                pipeline::run_pipeline(&config, Some(&exporter)).await?
            };

            if report.has_failures() {
                log::error!("Pipeline finished with capture failures");
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Validate => {
            pipeline::run_validate(&cli.config)?;
            log::info!("All validations passed!");
        }

        Command::Info => {
            let config = load_config(&cli.config)?;
            pipeline::run_info(&config).await?;
        }

        Command::MergeState {
            ours,
            theirs,
            output,
        } => {
            let ours_state = StateStore::new(&ours).load().await?;
            let theirs_state = StateStore::new(&theirs).load().await?;
            let merged = SyncState::merge(&ours_state, &theirs_state);

            let output = output.unwrap_or(ours);
            StateStore::new(&output).save(&merged).await?;
            log::info!(
                "Merged state written to {} ({} records)",
                output.display(),
                merged.entry_count()
            );
        }
    }

    log::info!("Done!");

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status_separates_fatal_errors() {
        assert_eq!(exit_status(&AppError::config("DISCORD_TOKEN is not set")), 2);
        assert_eq!(exit_status(&AppError::validation("no servers configured")), 2);
        assert_eq!(exit_status(&AppError::capture("srv", "listing refused")), 1);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(exit_status(&AppError::from(io)), 1);
    }
}
