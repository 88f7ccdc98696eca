//! Core business logic for HMS Sync.
//!
//! This module contains the core logic and orchestration for synchronizing
//! clinical data out of a hospital management system.
//!
//! # Modules
//!
//! - [`sync`] - Sync orchestration and summary reporting
//! - [`consent`] - Consent gate applied before any fetch or write
//! - [`triage`] - Priority classification of vital signs
//! - [`persistence`] - Mapping of canonical records onto store batches
//! - [`ingest`] - Import of canonical records from JSON files
//!
//! # Sync Workflow
//!
//! 1. **Consent**: Screen every requested patient through the consent gate
//! 2. **Authenticate**: Log in to the HMS once for the whole request
//! 3. **Fetch**: Retrieve each requested data type for the allowed patients
//! 4. **Classify**: Derive a triage priority for every vitals reading
//! 5. **Persist**: Store each data type as one transactional batch
//! 6. **Report**: Aggregate per-type counts into a sync summary
//!
//! # Example
//!
//! ```rust,no_run
//! use hms_sync::config::load_config;
//! use hms_sync::core::sync::{SyncCoordinator, SyncRequest};
//! use hms_sync::domain::PatientId;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("hms-sync.toml")?;
//! let credentials = config.hms.credentials.clone().ok_or("no credentials")?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! let coordinator = SyncCoordinator::new(config, shutdown_rx).await?;
//!
//! let request = SyncRequest::new(credentials, vec![PatientId::new("ERL-0042")?]);
//! let summary = coordinator.sync(request).await?;
//!
//! println!("Stored: {}/{}", summary.total_stored(), summary.total_attempted());
//! # Ok(())
//! # }
//! ```

pub mod consent;
pub mod ingest;
pub mod persistence;
pub mod sync;
pub mod triage;
