//! Domain error types
//!
//! This module defines the error hierarchy for the synchronization engine.
//! All errors are domain-specific and don't expose third-party types.

use thiserror::Error;

/// Main synchronization error type
///
/// Request-level failures (authentication, configuration, consent) surface to
/// the caller. Record-level failures (`PatientNotFound`, `Mapping`) are
/// recovered locally by skipping the record and are only constructed so they
/// can be logged and counted. `Cancelled` marks data types that shutdown
/// kept from starting.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The declared HMS system type has no client implementation
    #[error("Unsupported HMS system: {0}")]
    UnsupportedSystem(String),

    /// The HMS rejected the supplied credentials
    #[error("Authentication with {system} failed: {message}")]
    Authentication { system: String, message: String },

    /// A patient has not granted (or no longer grants) the required consent
    #[error("Patient {patient_id} has not granted {consent_type} consent")]
    ConsentDenied {
        patient_id: String,
        consent_type: String,
    },

    /// A record references a patient that does not exist in the target store
    #[error("Patient not found: {0}")]
    PatientNotFound(String),

    /// Network failure that survived the bounded retry budget
    #[error("Transient network error: {0}")]
    TransientNetwork(String),

    /// HMS-related errors
    #[error("HMS error: {0}")]
    Hms(#[from] HmsError),

    /// One external record could not be mapped to its canonical form
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// Target store rejected a batch; the batch was rolled back
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The operation was cancelled by a shutdown signal
    #[error("Cancelled: {0}")]
    Cancelled(String),
}

impl SyncError {
    /// Returns true when retrying the failed operation may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::TransientNetwork(_) => true,
            SyncError::Hms(e) => e.is_transient(),
            _ => false,
        }
    }

    /// Short machine-readable category, used in summaries and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            SyncError::Configuration(_) => "configuration",
            SyncError::UnsupportedSystem(_) => "unsupported_system",
            SyncError::Authentication { .. } => "authentication",
            SyncError::ConsentDenied { .. } => "consent_denied",
            SyncError::PatientNotFound(_) => "patient_not_found",
            SyncError::TransientNetwork(_) => "transient_network",
            SyncError::Hms(e) if e.is_transient() => "transient_network",
            SyncError::Hms(_) => "hms",
            SyncError::Mapping(_) => "mapping",
            SyncError::Persistence(_) => "persistence",
            SyncError::Validation(_) => "validation",
            SyncError::Serialization(_) => "serialization",
            SyncError::Io(_) => "io",
            SyncError::Cancelled(_) => "cancelled",
        }
    }
}

/// HMS transport errors
///
/// Errors that occur when talking to an external hospital management system.
/// These errors don't expose third-party HTTP client types.
#[derive(Debug, Error)]
pub enum HmsError {
    /// Failed to connect to the HMS
    #[error("Failed to connect to HMS: {0}")]
    ConnectionFailed(String),

    /// Request timed out
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {message}")]
    ServerError { status: u16, message: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {message}")]
    ClientError { status: u16, message: String },

    /// Rate limit exceeded (429)
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Response body was not the expected envelope
    #[error("Invalid response from server: {0}")]
    InvalidResponse(String),
}

impl HmsError {
    /// Connection failures, timeouts, 5xx and 429 are worth retrying
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HmsError::ConnectionFailed(_)
                | HmsError::Timeout(_)
                | HmsError::ServerError { .. }
                | HmsError::RateLimited(_)
        )
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        SyncError::Io(err.to_string())
    }
}

// Conversion from serde_json::Error
impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Serialization(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SyncError {
    fn from(err: toml::de::Error) -> Self {
        SyncError::Configuration(format!("TOML parse error: {err}"))
    }
}
