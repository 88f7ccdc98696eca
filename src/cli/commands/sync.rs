//! Sync command implementation
//!
//! This module implements the `sync` command for pulling clinical data from
//! an HMS into the target store.

use crate::cli::{exit_code_for, exit_codes};
use crate::config::{load_config, HmsCredentials};
use crate::core::sync::{SyncCoordinator, SyncRequest, SyncSummary};
use crate::domain::ids::parse_patient_ids;
use crate::domain::{parse_range_end, parse_timestamp, DataType, DateRange};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Patient ID(s) to synchronize (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub patient_id: Vec<String>,

    /// Only records on or after this timestamp (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub from: Option<String>,

    /// Only records on or before this timestamp (RFC 3339, or YYYY-MM-DD for the whole day)
    #[arg(long)]
    pub to: Option<String>,

    /// Data types to synchronize (comma-separated: vitals, labs, prescriptions, diagnoses)
    #[arg(long, value_delimiter = ',')]
    pub data_types: Vec<String>,

    /// Override the HMS system type from the configuration
    #[arg(long)]
    pub system: Option<String>,

    /// Override the HMS base URL from the configuration
    #[arg(long)]
    pub base_url: Option<String>,
}

impl SyncArgs {
    /// Execute the sync command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting sync command");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        let request = match self.build_request(config.hms.credentials.clone()) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Invalid sync arguments");
                eprintln!("Invalid sync arguments: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        tracing::info!("Creating sync coordinator");
        let coordinator = match SyncCoordinator::new(config, shutdown_signal).await {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create sync coordinator");
                eprintln!("Failed to initialize sync: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!("🚀 Starting sync...");
        println!();

        let summary = match coordinator.sync(request).await {
            Ok(s) => s,
            Err(e) => {
                tracing::error!(error = %e, error_kind = e.kind(), "Sync failed");
                eprintln!("Sync failed: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        print_summary(&summary);

        let exit_code = if summary.was_cancelled() {
            println!("⚠️  Sync interrupted; data types not yet started were skipped.");
            tracing::info!("Sync interrupted by user signal");
            exit_codes::INTERRUPTED
        } else if summary.is_successful() {
            println!("✅ Sync completed successfully!");
            exit_codes::SUCCESS
        } else {
            println!("⚠️  Sync completed with failures");
            exit_codes::PARTIAL
        };

        Ok(exit_code)
    }

    /// Combine configured credentials with CLI overrides into a request
    pub fn build_request(
        &self,
        credentials: Option<HmsCredentials>,
    ) -> anyhow::Result<SyncRequest> {
        let mut credentials = match (credentials, &self.system, &self.base_url) {
            (Some(c), _, _) => c,
            (None, Some(system), Some(base_url)) => HmsCredentials::new(system, base_url),
            (None, _, _) => anyhow::bail!(
                "no [hms.credentials] configured; set them or pass --system and --base-url"
            ),
        };
        if let Some(ref system) = self.system {
            credentials.system_type = system.clone();
        }
        if let Some(ref base_url) = self.base_url {
            credentials.base_url = base_url.clone();
        }

        let patient_ids = parse_patient_ids(self.patient_id.iter().cloned())
            .map_err(anyhow::Error::msg)?;

        let from = self
            .from
            .as_deref()
            .map(parse_timestamp)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let to = self
            .to
            .as_deref()
            .map(parse_range_end)
            .transpose()
            .map_err(anyhow::Error::msg)?;
        let date_range = DateRange::new(from, to).map_err(anyhow::Error::msg)?;

        let mut request = SyncRequest::new(credentials, patient_ids).with_date_range(date_range);
        if !self.data_types.is_empty() {
            let data_types = self
                .data_types
                .iter()
                .map(|raw| raw.parse::<DataType>())
                .collect::<Result<Vec<_>, _>>()
                .map_err(anyhow::Error::msg)?;
            request = request.only(&data_types);
        }

        Ok(request)
    }
}

fn print_summary(summary: &SyncSummary) {
    println!("📊 Sync Summary ({}):", summary.sync_id);
    println!("  System: {}", summary.system);
    println!(
        "  Patients: {} requested, {} synced, {} denied",
        summary.patients_requested,
        summary.patients_synced,
        summary.denied_patients.len()
    );
    for patient_id in &summary.denied_patients {
        println!("    - consent denied: {patient_id}");
    }
    println!();
    println!(
        "  {:<15} {:>8} {:>10} {:>8} {:>8}  {}",
        "Data type", "Fetched", "Malformed", "Stored", "Skipped", "Status"
    );
    println!("  {}", "-".repeat(70));
    for t in &summary.types {
        let status = match (&t.error, t.cancelled) {
            (_, true) => "cancelled".to_string(),
            (Some(error), _) => format!("failed ({}): {}", error.kind, error.message),
            (None, false) if !t.failed_patients.is_empty() => {
                format!("partial ({} patients failed)", t.failed_patients.len())
            }
            (None, false) => "ok".to_string(),
        };
        println!(
            "  {:<15} {:>8} {:>10} {:>8} {:>8}  {}",
            t.data_type.as_str(),
            t.fetched,
            t.malformed,
            t.stored,
            t.skipped,
            status
        );
        for failure in &t.failed_patients {
            println!("    - {}: {} ({})", failure.patient_id, failure.message, failure.kind);
        }
    }
    println!();
    println!(
        "  Stored: {} of {} attempted ({:.2}%)",
        summary.total_stored(),
        summary.total_attempted(),
        summary.success_rate()
    );
    println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
    println!();
}
