//! Configuration management.
//!
//! This module provides TOML-based configuration loading, parsing, and validation.
//!
//! # Overview
//!
//! Configuration files support:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - Default values for optional settings
//! - `HMS_SYNC_*` environment overrides
//! - Validation before anything connects
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hms_sync::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hms-sync.toml")?;
//!
//! println!("Max concurrency: {}", config.hms.max_concurrency);
//! println!("Missing consent policy: {:?}", config.consent.missing_consent);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Log level
//! - [`HmsConfig`] - HMS timeouts, concurrency, retry and default [`HmsCredentials`]
//! - [`ConsentConfig`] - Consent type and gate policies
//! - [`PostgreSQLConfig`] - Target store connection
//! - [`LoggingConfig`] - Optional JSON file logging
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "staging"
//! database_target = "postgresql"
//!
//! [application]
//! log_level = "info"
//!
//! [hms]
//! max_concurrency = 4
//! request_timeout_seconds = 300
//!
//! [hms.credentials]
//! system_type = "openmrs"
//! base_url = "https://openmrs.example.org/openmrs"
//! username = "sync_user"
//! password = "${OPENMRS_PASSWORD}"
//!
//! [consent]
//! consent_type = "data_sync"
//! missing_consent = "deny"
//! denial_scope = "skip_patient"
//!
//! [postgresql]
//! connection_string = "${DATABASE_URL}"
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, ConsentConfig, DatabaseTarget, DenialScope, Environment, HmsConfig,
    HmsCredentials, LoggingConfig, MissingConsentPolicy, PostgreSQLConfig, RetryConfig,
    SyncConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
