//! External system integrations.
//!
//! This module provides adapters for the systems the engine talks to:
//!
//! - [`hms`] - Hospital management system clients (OpenMRS, AfyaPro, custom EMR)
//! - [`database`] - Storage abstraction layer (trait-based)
//! - [`postgresql`] - PostgreSQL implementation
//! - [`memory`] - In-process implementation for tests and local runs
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. Both sides of a sync use
//! trait objects: [`hms::HmsClient`] for the source and
//! [`database::ClinicalStore`] / [`database::ConsentStore`] for the target.
//!
//! # HMS Adapter
//!
//! ```rust,no_run
//! use hms_sync::adapters::hms::create_hms_client;
//! use hms_sync::config::{secret_string, HmsConfig, HmsCredentials};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let credentials = HmsCredentials::new("custom", "https://emr.example.org")
//!     .with_login("sync", secret_string("secret".to_string()));
//!
//! let mut client = create_hms_client(&credentials, &HmsConfig::default())?;
//! if !client.authenticate().await? {
//!     eprintln!("credentials rejected by {}", client.base_url());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Storage
//!
//! ```rust
//! use hms_sync::adapters::database::ClinicalStore;
//! use hms_sync::adapters::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! assert_eq!(store.backend_name(), "memory");
//! ```

pub mod database;
pub mod hms;
pub mod memory;
pub mod postgresql;
