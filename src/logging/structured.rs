//! Subscriber setup for compile runs
//!
//! Human-readable events go to stderr so that dry-run SQL on stdout can be
//! piped as is. With `logging.local_enabled`, every event is also appended
//! as one flattened JSON object per line to `<local_path>/cdr-deid.<date>.log`.

use crate::config::LoggingConfig;
use crate::domain::{DeidError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

const LOG_PREFIX: &str = "cdr-deid";
const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Flushes the JSON log file when dropped; hold it until the process exits
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Install the global subscriber
///
/// `RUST_LOG`, when set, replaces the `cdr_deid=<level>` filter.
///
/// # Errors
///
/// [`DeidError::Configuration`] for an unknown level, an unusable log
/// directory, or a subscriber that is already installed.
pub fn init_logging(level: &str, config: &LoggingConfig) -> Result<LoggingGuard> {
    let level = check_level(level)?;

    let (file, guard) = if config.local_enabled {
        let (layer, guard) = file_layer(config, crate_filter(&level))?;
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(crate_filter(&level));

    tracing_subscriber::registry()
        .with(file)
        .with(console)
        .try_init()
        .map_err(|e| DeidError::Configuration(format!("logging already initialized: {e}")))?;

    tracing::info!(
        level = %level,
        log_dir = config.local_enabled.then_some(config.local_path.as_str()),
        "Logging initialized"
    );

    Ok(LoggingGuard { _file: guard })
}

fn check_level(level: &str) -> Result<String> {
    let level = level.to_lowercase();
    if LEVELS.contains(&level.as_str()) {
        Ok(level)
    } else {
        Err(DeidError::Configuration(format!(
            "invalid log level '{level}'; expected one of: {}",
            LEVELS.join(", ")
        )))
    }
}

fn crate_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("cdr_deid={level}")))
}

/// Rolling period for a validated `logging.local_rotation`
fn rotation(name: &str) -> Rotation {
    match name {
        "hourly" => Rotation::HOURLY,
        _ => Rotation::DAILY,
    }
}

fn file_layer(config: &LoggingConfig, filter: EnvFilter) -> Result<(BoxedLayer, WorkerGuard)> {
    let dir = Path::new(&config.local_path);
    let unusable = |e: &dyn std::fmt::Display| {
        DeidError::Configuration(format!("log directory {}: {e}", dir.display()))
    };

    std::fs::create_dir_all(dir).map_err(|e| unusable(&e))?;
    let appender = RollingFileAppender::builder()
        .rotation(rotation(&config.local_rotation))
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .max_log_files(config.local_max_files)
        .build(dir)
        .map_err(|e| unusable(&e))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let layer = tracing_subscriber::fmt::layer()
        .json()
        .flatten_event(true)
        .with_writer(writer)
        .with_filter(filter)
        .boxed();
    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_case_insensitive() {
        assert_eq!(check_level("WARN").unwrap(), "warn");
        assert_eq!(check_level("Debug").unwrap(), "debug");
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = check_level("verbose").unwrap_err().to_string();
        assert!(err.contains("trace, debug, info, warn, error"), "{err}");
        assert!(check_level("").is_err());
    }

    #[test]
    fn test_rotation_names() {
        assert_eq!(rotation("hourly"), Rotation::HOURLY);
        assert_eq!(rotation("daily"), Rotation::DAILY);
    }

    #[test]
    fn test_file_layer_reports_unusable_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();

        let config = LoggingConfig {
            local_path: blocker.join("logs").to_string_lossy().to_string(),
            ..LoggingConfig::default()
        };
        let err = file_layer(&config, EnvFilter::new("cdr_deid=info"))
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("log directory"), "{err}");
    }
}
