//! Logging setup
//!
//! Levels use the names operators put in the config file (`ERROR`,
//! `WARNING`, `INFO`, `DEBUG`); anything unrecognised means `WARNING`.
//! `RUST_LOG`, when set, replaces the derived filter entirely.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::CouplerConfig;

/// Maps a configured level name to a tracing level directive
pub fn level_directive(level: &str) -> &'static str {
    match level.trim().to_ascii_uppercase().as_str() {
        "ERROR" => "error",
        "WARNING" | "WARN" => "warn",
        "INFO" => "info",
        "DEBUG" => "debug",
        _ => "warn",
    }
}

fn default_filter(level: &str) -> String {
    let directive = level_directive(level);
    format!("pa_es_coupler={directive},pacoupler_client={directive}")
}

/// Installs the global subscriber
pub fn init(config: &CouplerConfig) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(&config.loglevel)));

    let (file_layer, stderr_layer) = match &config.logfile {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {:?}", path))?;
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file));
            (Some(layer), None)
        }
        None => (None, Some(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .context("Failed to install the tracing subscriber")?;
    Ok(())
}
