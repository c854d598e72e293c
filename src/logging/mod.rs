//! Logging and observability
//!
//! Structured logging through `tracing`:
//! - human-readable console output
//! - optional JSON log files with rotation
//! - `RUST_LOG` filtering
//!
//! # Example
//!
//! ```no_run
//! use cdr_deid::logging::init_logging;
//! use cdr_deid::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!("Application started");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a table compilation
///
/// # Example
///
/// ```no_run
/// use cdr_deid::log_compile_start;
/// use cdr_deid::rules::Dialect;
///
/// log_compile_start!("person", Dialect::Bigquery);
/// ```
#[macro_export]
macro_rules! log_compile_start {
    ($table:expr, $dialect:expr) => {
        tracing::info!(
            table = %$table,
            dialect = %$dialect,
            "Compiling table"
        );
    };
}

/// Log the completion of a table compilation
///
/// # Example
///
/// ```no_run
/// use cdr_deid::log_compile_complete;
/// use std::time::Duration;
///
/// log_compile_complete!("person", 12, 2, Duration::from_millis(3));
/// ```
#[macro_export]
macro_rules! log_compile_complete {
    ($table:expr, $fragments:expr, $filters:expr, $duration:expr) => {
        tracing::info!(
            table = %$table,
            fragments = $fragments,
            row_filters = $filters,
            duration_ms = $duration.as_millis(),
            "Table compiled"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use cdr_deid::log_error_with_context;
/// use cdr_deid::domain::DeidError;
///
/// let error = DeidError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
