// HMS Sync - Clinical data synchronization engine
// Copyright (c) 2025 HMS Sync Contributors
// Licensed under the MIT License

//! # HMS Sync - Clinical data synchronization engine
//!
//! HMS Sync pulls vital signs, laboratory results, prescriptions and
//! diagnoses for consenting patients out of hospital management systems
//! (OpenMRS, AfyaPro and CustomEMR) and writes them into a PostgreSQL
//! clinical schema, deriving a triage queue entry from each vital signs
//! reading.
//!
//! ## Overview
//!
//! This library provides the core functionality for:
//! - **Fetching** clinical records through vendor adapters that normalize
//!   each HMS's payloads into canonical records
//! - **Gating** every patient on a recorded, unexpired consent grant
//! - **Classifying** vital signs into a triage priority
//! - **Persisting** records idempotently, one transaction per batch
//!
//! ## Architecture
//!
//! HMS Sync follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Business logic (sync coordination, consent, triage, persistence)
//! - [`adapters`] - External integrations (HMS vendors, PostgreSQL, in-memory store)
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hms_sync::config::{load_config, HmsCredentials};
//! use hms_sync::core::sync::{SyncCoordinator, SyncRequest};
//! use hms_sync::domain::PatientId;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("hms-sync.toml")?;
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     let coordinator = SyncCoordinator::new(config, shutdown_rx).await?;
//!
//!     let credentials = HmsCredentials::new("openmrs", "https://openmrs.example.org/openmrs");
//!     let request = SyncRequest::new(credentials, vec![PatientId::new("P-1001")?]);
//!     let summary = coordinator.sync(request).await?;
//!
//!     println!("Stored {} records", summary.total_stored());
//!     Ok(())
//! }
//! ```
//!
//! ## Consent
//!
//! A patient is synchronized only while their latest consent record of the
//! configured type is granted and unexpired. Patients with no record are
//! denied unless `consent.missing_consent = "allow"`.
//!
//! ```rust,no_run
//! use hms_sync::core::consent::ConsentGate;
//! use hms_sync::domain::{ConsentGrant, ConsentType, PatientId};
//!
//! # async fn example(gate: &ConsentGate) -> Result<(), Box<dyn std::error::Error>> {
//! let patient = PatientId::new("P-1001")?;
//! let receipt = gate
//!     .log(&patient, ConsentType::DataSync, ConsentGrant::new("nurse.amina"))
//!     .await?;
//! assert!(gate.verify(&patient, ConsentType::DataSync).await);
//! println!("Consent receipt: {receipt}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Fallible operations return [`domain::SyncError`]. Request-level failures
//! (configuration, authentication, consent denial under `abort_request`) are
//! returned as errors; data-type failures are recorded in the
//! [`core::sync::SyncSummary`] instead.
//!
//! ## Logging
//!
//! HMS Sync uses structured logging with the `tracing` crate. Patient
//! identifiers are logged; clinical values and credentials never are.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
