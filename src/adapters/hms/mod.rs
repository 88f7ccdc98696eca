//! HMS adapter implementation
//!
//! This module provides the integration with external hospital management
//! systems: the client trait and its implementations, the factory that picks
//! one from a system-type string, and the shared HTTP transport.

pub mod client;
pub mod models;
pub mod transport;
pub mod vendor;

pub use client::{create_hms_client, HmsSystemType};
pub use models::{Fetched, PatientFailure};
pub use transport::{AuthHeader, HmsTransport};
pub use vendor::{AfyaProClient, CustomEmrClient, HmsClient, OpenMrsClient};
