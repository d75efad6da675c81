//! Tracing setup.
//!
//! Two sinks:
//! - stderr, human-readable, filtered by `RUST_LOG` (default `fuelcast=info`)
//! - `<log_dir>/pipeline.log`, plain text and append-only: the run log every
//!   skipped file, dropped-record count, and retry ends up in

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::AppError;

pub const RUN_LOG_FILE: &str = "pipeline.log";
const DEFAULT_FILTER: &str = "fuelcast=info";

/// Install the global subscriber. Calling it twice is harmless; the second
/// call leaves the first subscriber in place.
pub fn init(log_dir: &Path) -> Result<(), AppError> {
    let path = log_dir.join(RUN_LOG_FILE);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| AppError::input(format!("Failed to open run log '{}': {e}", path.display())))?;

    let stderr_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(stderr_filter);

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(run_log_layer(file))
        .try_init()
        .ok();

    Ok(())
}

/// Plain-text layer for the run log. Ignores `RUST_LOG`.
pub fn run_log_layer<S>(file: File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(Arc::new(file))
        .with_ansi(false)
        .with_filter(EnvFilter::new(DEFAULT_FILTER))
}
