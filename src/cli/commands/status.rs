//! Status command implementation
//!
//! This module implements the `status` command: supported HMS systems, the
//! active consent policy and target store connectivity.

use crate::adapters::database::create_stores;
use crate::adapters::hms::HmsSystemType;
use crate::cli::{exit_code_for, exit_codes};
use crate::config::load_config;
use clap::Args;

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Skip the store connectivity check
    #[arg(long)]
    pub offline: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking sync status");

        println!("📊 HMS Sync Status");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        println!("Supported HMS systems:");
        println!("  {:<12} {:<30}", "System", "Authentication");
        println!("  {}", "-".repeat(42));
        for system in HmsSystemType::ALL {
            println!("  {:<12} {:<30}", system.as_str(), system.auth_scheme());
        }
        println!();

        println!("Consent policy:");
        println!("  Required consent: {}", config.consent.consent_type);
        println!("  Missing consent: {:?}", config.consent.missing_consent);
        println!("  Denial scope: {:?}", config.consent.denial_scope);
        if config.consent.max_age_days == 0 {
            println!("  Max age: unlimited");
        } else {
            println!("  Max age: {} days", config.consent.max_age_days);
        }
        println!();

        if self.offline {
            return Ok(exit_codes::SUCCESS);
        }

        let stores = match create_stores(&config).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to create target store");
                println!("   Error: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let backend = stores.clinical.backend_name();
        match stores.clinical.test_connection().await {
            Ok(()) => {
                println!("✅ Target store ({backend}) is reachable");
                Ok(exit_codes::SUCCESS)
            }
            Err(e) => {
                println!("❌ Target store ({backend}) is unreachable");
                println!("   Error: {e}");
                Ok(exit_codes::CONNECTION)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_status_with_memory_store() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"database_target = \"memory\"\n").unwrap();

        let args = StatusArgs { offline: false };
        let code = args.execute(file.path().to_str().unwrap()).await.unwrap();
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn test_status_without_config() {
        let args = StatusArgs { offline: true };
        assert_eq!(args.execute("missing.toml").await.unwrap(), 2);
    }
}
