use crate::models::LoggingConfig;
use anyhow::{Context, Result};
use camino::Utf8Path;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Create the log directory if it doesn't exist.
pub fn ensure_log_dir(log_dir: &str) -> Result<()> {
    let log_path = Utf8Path::new(log_dir);
    if !log_path.exists() {
        fs::create_dir_all(log_path)
            .with_context(|| format!("Failed to create log directory: {}", log_dir))?;
    }
    Ok(())
}

/// Log level filter for the configured mode.
///
/// `RUST_LOG` wins when set, so a single module can be turned up without
/// editing the config file.
fn env_filter(debug_mode: bool) -> EnvFilter {
    let default_level = if debug_mode { "debug" } else { "info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Setup logging with a daily rotating file and optional console output.
///
/// # Arguments
/// * `config` - Log directory, file prefix, level, console toggle and file format
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(config: &LoggingConfig) -> Result<WorkerGuard> {
    ensure_log_dir(&config.dir)?;

    let file_appender = rolling::daily(&config.dir, &config.prefix);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Exactly one of the two file layers is installed
    let (text_layer, json_layer) = if config.json {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        (None, Some(layer))
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false) // No ANSI codes in log files
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        (Some(layer), None)
    };

    // Console goes to stderr so stdout stays clean for the result listing
    let console_layer = config.console.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false)
    });

    tracing_subscriber::registry()
        .with(env_filter(config.debug))
        .with(text_layer)
        .with(json_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console={}, json={}",
        config.dir,
        config.prefix,
        config.debug,
        config.console,
        config.json
    );

    Ok(guard)
}
