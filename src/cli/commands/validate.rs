//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the HMS Sync configuration file.

use crate::adapters::postgresql::client::mask_connection_string;
use crate::cli::exit_codes;
use crate::config::load_config;
use crate::config::schema::DatabaseTarget;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {}

impl ValidateArgs {
    /// Execute the validate-config command
    ///
    /// `load_config` validates as part of loading, so any failure here is
    /// reported as a configuration error.
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        println!("✅ Configuration is valid");
        println!();
        println!("Configuration Summary:");
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  HMS Max Concurrency: {}", config.hms.max_concurrency);
        println!(
            "  HMS Timeouts: {}s per call, {}s per request",
            config.hms.timeout_seconds, config.hms.request_timeout_seconds
        );
        println!("  HMS Max Retries: {}", config.hms.retry.max_retries);

        match config.hms.credentials {
            Some(ref credentials) => {
                println!("  HMS System: {}", credentials.system_type);
                println!("  HMS Base URL: {}", credentials.normalized_base_url());
            }
            None => println!("  HMS Credentials: not configured (pass them to `sync`)"),
        }

        println!("  Consent Type: {}", config.consent.consent_type);
        println!("  Missing Consent: {:?}", config.consent.missing_consent);
        println!("  Denial Scope: {:?}", config.consent.denial_scope);

        match config.database_target {
            DatabaseTarget::PostgreSQL => {
                if let Some(ref pg_config) = config.postgresql {
                    use secrecy::ExposeSecret;
                    println!("  Database Target: PostgreSQL");
                    println!(
                        "  PostgreSQL Connection: {}",
                        mask_connection_string(pg_config.connection_string.expose_secret().as_str())
                    );
                    println!("  Max Connections: {}", pg_config.max_connections);
                }
            }
            DatabaseTarget::Memory => {
                println!("  Database Target: Memory (data is not persisted)");
            }
        }
        println!();

        Ok(exit_codes::SUCCESS)
    }
}
