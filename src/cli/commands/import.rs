//! Import command implementation
//!
//! This module implements the `import` command, which stores canonical
//! records from a JSON file through the same persistence path as `sync`.

use crate::adapters::database::create_stores;
use crate::cli::{exit_code_for, exit_codes};
use crate::config::load_config;
use crate::core::ingest::ingest_file;
use crate::core::persistence::PersistenceMapper;
use crate::domain::DataType;
use clap::Args;

/// Arguments for the import command
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// JSON file containing an array of records
    #[arg(short, long)]
    pub file: String,

    /// Record type held in the file (vitals, labs, prescriptions, diagnoses)
    #[arg(short, long)]
    pub data_type: String,
}

impl ImportArgs {
    /// Execute the import command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(file = %self.file, data_type = %self.data_type, "Starting import");

        let data_type: DataType = match self.data_type.parse() {
            Ok(t) => t,
            Err(e) => {
                eprintln!("❌ {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        let stores = match create_stores(&config).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to connect to the target store: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let mapper = PersistenceMapper::new(stores.clinical);
        let report = match ingest_file(&mapper, &self.file, data_type).await {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Import failed");
                eprintln!("❌ Import failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("📊 Import Summary:");
        println!("  File: {}", self.file);
        println!("  Data type: {}", report.data_type);
        println!("  Entries: {}", report.total);
        println!("  Malformed: {}", report.malformed);
        println!("  Stored: {}", report.store.stored);
        println!("  Skipped (unknown patient): {}", report.store.skipped);
        println!();

        if report.store.stored == report.total {
            println!("✅ Import completed successfully!");
            Ok(exit_codes::SUCCESS)
        } else {
            println!("⚠️  Import completed with skipped records");
            Ok(exit_codes::PARTIAL)
        }
    }
}
