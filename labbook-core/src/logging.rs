//! Tracing setup for binaries embedding labbook.
//!
//! Human-readable events go to stderr; when [`LogSettings::json_dir`] is set,
//! structured JSON events are also appended to a daily rolling file.

use crate::error::{LabError, Result};
use crate::settings::LogSettings;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Build an `EnvFilter`, falling back to `info` on an invalid directive.
pub fn env_filter(directive: &str) -> EnvFilter {
    EnvFilter::try_new(directive).unwrap_or_else(|e| {
        eprintln!("Invalid log filter '{directive}': {e}; using 'info'");
        EnvFilter::new("info")
    })
}

/// Install the global subscriber.
///
/// The returned guard flushes the JSON file writer on drop; keep it alive for
/// the lifetime of the program.
pub fn init_tracing(settings: &LogSettings) -> Result<Option<WorkerGuard>> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(env_filter(&settings.filter));

    let (json_layer, guard) = match &settings.json_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("labbook")
                .filename_suffix("log")
                .build(dir)
                .map_err(|e| LabError::Logging(e.to_string()))?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(EnvFilter::new("debug"));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .try_init()
        .map_err(|e| LabError::Logging(e.to_string()))?;

    Ok(guard)
}
