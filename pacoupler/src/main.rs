//! PA to Elasticsearch coupler
//!
//! Imports Performance Analyser test runs and page objects into
//! Elasticsearch, attributing each page object to the third party serving
//! it.
//!
//! Architecture:
//! - Configuration: TOML file with command-line overrides
//! - Repositories: PA API, tag database and index behind traits
//! - Services: enrichment, watermark resolution, the sync pipeline
//! - Scheduler: single-shot or poll mode, lock file, signal handling
//!
//! Each cycle resumes from the newest test run already in the index, so
//! repeated runs only fetch what is new.

mod config;
mod error;
mod lock;
mod logging;
mod repository;
mod scheduler;
mod service;
mod signals;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::{Config, ConfigOverrides, EXAMPLE_CONFIG, RunMode};
use crate::scheduler::{ConfigCycleFactory, CycleSetup, Outcome, RunCoordinator};

#[derive(Parser, Debug)]
#[command(name = "pa-es-coupler", version)]
#[command(about = "Imports Performance Analyser results into Elasticsearch", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, env = "PA_ES_COUPLER_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Log file (overrides coupler.logfile)
    #[arg(long = "log", env = "PA_ES_COUPLER_LOG")]
    logfile: Option<PathBuf>,

    /// ERROR, WARNING, INFO or DEBUG (overrides coupler.loglevel)
    #[arg(long, env = "PA_ES_COUPLER_LOGLEVEL")]
    loglevel: Option<String>,

    /// Lock file (overrides coupler.lockfile)
    #[arg(long, env = "PA_ES_COUPLER_LOCKFILE")]
    lockfile: Option<PathBuf>,

    /// Ignore what is already indexed and import everything
    #[arg(long)]
    full_index: bool,

    /// Sync once and exit (overrides coupler.mode)
    #[arg(long, conflicts_with = "poll")]
    once: bool,

    /// Keep running and sync every poll period (overrides coupler.mode)
    #[arg(long)]
    poll: bool,

    /// Print a sample configuration file and exit
    #[arg(long)]
    example_config: bool,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        let mode = match (self.once, self.poll) {
            (true, _) => Some(RunMode::Once),
            (_, true) => Some(RunMode::Poll),
            _ => None,
        };
        ConfigOverrides {
            logfile: self.logfile.clone(),
            loglevel: self.loglevel.clone(),
            lockfile: self.lockfile.clone(),
            mode,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.example_config {
        print!("{}", EXAMPLE_CONFIG);
        return ExitCode::SUCCESS;
    }

    match run(cli).await {
        Ok(outcome) => ExitCode::from(outcome.exit_code()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(Outcome::Failed.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<Outcome> {
    let overrides = cli.overrides();
    let config = Config::load(&cli.config, &overrides)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    logging::init(&config.coupler)?;
    info!("Starting PA to Elasticsearch coupler in {:?} mode", config.coupler.mode);

    let setup = CycleSetup::from_config(&config).context("Failed to set up the sync cycle")?;
    let factory = Arc::new(ConfigCycleFactory::new(cli.config.clone(), overrides));
    let (events_tx, events_rx) = mpsc::channel(8);
    let mut coordinator = RunCoordinator::new(factory, events_rx, cli.full_index);

    let outcome = match config.coupler.mode {
        RunMode::Once => coordinator.run_once(&setup).await,
        RunMode::Poll => {
            signals::spawn_signal_listener(events_tx).context("Failed to install signal handlers")?;
            coordinator.run_poll(setup).await
        }
    };

    info!("Coupler finished: {:?}", outcome);
    Ok(outcome)
}
