//! Indumine Crawler main entry point
//!
//! Runs either as a remotely controlled service (MQTT command/status
//! topics) or as a one-shot standalone job.

use clap::Parser;
use indumine_crawler::config::load_config_with_hash;
use indumine_crawler::control::{run_standalone, ControlManager, JobMode, JobOutcome};
use indumine_crawler::session::WebDriverFactory;
use indumine_crawler::CrawlerError;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Indumine Crawler: catalog crawl orchestration engine
///
/// Discovers product pages on a catalog site through a pool of headless
/// browser sessions, extracts their specification tables into a CSV
/// sink, and loads the sink into a relational catalog database. Without
/// `--standalone` it connects to the MQTT broker and waits for start and
/// stop commands.
#[derive(Parser, Debug)]
#[command(name = "indumine-crawler")]
#[command(version = "0.3.0")]
#[command(about = "Remotely controllable catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Run one job locally instead of connecting to the broker
    #[arg(long)]
    standalone: bool,

    /// Job to run in standalone mode: discovery, product, or full
    #[arg(long, default_value = "full")]
    job: JobMode,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config_with_hash(&cli.config) {
        Ok((config, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let factory = Arc::new(WebDriverFactory::new(&config.browser));

    if cli.standalone {
        match run_standalone(&config, cli.job, factory).await {
            Ok(JobOutcome::Completed) => ExitCode::SUCCESS,
            Ok(JobOutcome::Cancelled) => ExitCode::FAILURE,
            Err(e @ CrawlerError::MissingPrerequisite { .. }) => {
                tracing::error!("{}", e);
                ExitCode::FAILURE
            }
            Err(e) => {
                tracing::error!("Job failed: {}", e);
                ExitCode::FAILURE
            }
        }
    } else {
        // The control loop reconnects forever; it only exits with the
        // process.
        ControlManager::new(config, factory).run().await;
        ExitCode::SUCCESS
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("indumine_crawler=info,warn"),
            1 => EnvFilter::new("indumine_crawler=debug,info"),
            2 => EnvFilter::new("indumine_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
