//! Logging and observability
//!
//! Structured logging through `tracing`, with:
//! - human-readable console output
//! - optional JSON file output with rotation
//! - `RUST_LOG` / configured level filtering
//!
//! The macros below keep the field names of sync lifecycle events consistent
//! so log queries can rely on them.
//!
//! # Example
//!
//! ```no_run
//! use hms_sync::logging::init_logging;
//! use hms_sync::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(system = "openmrs", "Sync requested");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a sync request
///
/// ```no_run
/// use hms_sync::log_sync_start;
///
/// let sync_id = uuid::Uuid::new_v4();
/// log_sync_start!(sync_id, "openmrs", 12);
/// ```
#[macro_export]
macro_rules! log_sync_start {
    ($sync_id:expr, $system:expr, $patients:expr) => {
        tracing::info!(
            sync_id = %$sync_id,
            system = %$system,
            patients = $patients,
            "Starting sync"
        );
    };
}

/// Log the completion of a sync request
///
/// ```no_run
/// use hms_sync::log_sync_complete;
/// use std::time::Duration;
///
/// let sync_id = uuid::Uuid::new_v4();
/// log_sync_complete!(sync_id, 40, 42, Duration::from_secs(3));
/// ```
#[macro_export]
macro_rules! log_sync_complete {
    ($sync_id:expr, $stored:expr, $attempted:expr, $duration:expr) => {
        tracing::info!(
            sync_id = %$sync_id,
            stored = $stored,
            attempted = $attempted,
            duration_ms = $duration.as_millis() as u64,
            "Sync completed"
        );
    };
}

/// Log a record that was skipped without failing its batch
///
/// ```no_run
/// use hms_sync::log_record_skipped;
///
/// log_record_skipped!("lab_results", "P-404", "patient not found");
/// ```
#[macro_export]
macro_rules! log_record_skipped {
    ($data_type:expr, $patient_id:expr, $reason:expr) => {
        tracing::warn!(
            data_type = %$data_type,
            patient_id = %$patient_id,
            reason = %$reason,
            "Skipping record"
        );
    };
}

/// Log a retry attempt
///
/// ```no_run
/// use hms_sync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, 1000u64, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_retries:expr, $delay_ms:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_retries = $max_retries,
            delay_ms = $delay_ms,
            reason = %$reason,
            "Retrying request after error"
        );
    };
}
