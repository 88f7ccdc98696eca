//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for HMS Sync using clap.

pub mod commands;

use crate::domain::SyncError;
use clap::{Parser, Subcommand};

/// Process exit codes shared by every command
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    /// Some records or data types were not synchronized
    pub const PARTIAL: i32 = 1;
    pub const CONFIGURATION: i32 = 2;
    pub const AUTHENTICATION: i32 = 3;
    pub const CONNECTION: i32 = 4;
    pub const FATAL: i32 = 5;
    /// Stopped by SIGINT or SIGTERM
    pub const INTERRUPTED: i32 = 130;
}

/// Map a request-level error to the process exit code
pub fn exit_code_for(error: &SyncError) -> i32 {
    match error {
        SyncError::Configuration(_)
        | SyncError::UnsupportedSystem(_)
        | SyncError::Validation(_) => exit_codes::CONFIGURATION,
        SyncError::Authentication { .. } => exit_codes::AUTHENTICATION,
        SyncError::TransientNetwork(_) | SyncError::Hms(_) | SyncError::Persistence(_) => {
            exit_codes::CONNECTION
        }
        SyncError::Cancelled(_) => exit_codes::INTERRUPTED,
        _ => exit_codes::FATAL,
    }
}

/// HMS Sync - clinical data synchronization engine
#[derive(Parser, Debug)]
#[command(name = "hms-sync")]
#[command(version, about, long_about = None)]
#[command(author = "HMS Sync Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "hms-sync.toml", env = "HMS_SYNC_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "HMS_SYNC_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Synchronize clinical data from an HMS into the target store
    Sync(commands::sync::SyncArgs),

    /// Import canonical records from a JSON file
    Import(commands::import::ImportArgs),

    /// Log or verify patient consent
    Consent(commands::consent::ConsentArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show supported systems, consent policy and store connectivity
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::HmsError;

    #[test]
    fn test_cli_parse_sync() {
        let cli = Cli::parse_from(["hms-sync", "sync", "--patient-id", "P-1,P-2"]);
        assert_eq!(cli.config, "hms-sync.toml");
        match cli.command {
            Commands::Sync(args) => assert_eq!(args.patient_id, vec!["P-1", "P-2"]),
            other => panic!("expected sync, got {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_with_config() {
        let cli = Cli::parse_from(["hms-sync", "--config", "custom.toml", "status"]);
        assert_eq!(cli.config, "custom.toml");
    }

    #[test]
    fn test_cli_parse_with_log_level() {
        let cli = Cli::parse_from(["hms-sync", "--log-level", "debug", "status"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_cli_parse_validate_config() {
        let cli = Cli::parse_from(["hms-sync", "validate-config"]);
        assert!(matches!(cli.command, Commands::ValidateConfig(_)));
    }

    #[test]
    fn test_cli_parse_consent_verify() {
        let cli = Cli::parse_from(["hms-sync", "consent", "verify", "--patient-id", "P-1"]);
        assert!(matches!(cli.command, Commands::Consent(_)));
    }

    #[test]
    fn test_cli_parse_import() {
        let cli = Cli::parse_from([
            "hms-sync",
            "import",
            "--file",
            "labs.json",
            "--data-type",
            "labs",
        ]);
        assert!(matches!(cli.command, Commands::Import(_)));
    }

    #[test]
    fn test_cli_parse_init() {
        let cli = Cli::parse_from(["hms-sync", "init"]);
        assert!(matches!(cli.command, Commands::Init(_)));
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(exit_code_for(&SyncError::UnsupportedSystem("x".into())), 2);
        assert_eq!(
            exit_code_for(&SyncError::Authentication {
                system: "openmrs".into(),
                message: "rejected".into()
            }),
            3
        );
        assert_eq!(
            exit_code_for(&SyncError::from(HmsError::Timeout("30s".into()))),
            4
        );
        assert_eq!(
            exit_code_for(&SyncError::ConsentDenied {
                patient_id: "P-1".into(),
                consent_type: "data_sync".into()
            }),
            5
        );
    }
}
