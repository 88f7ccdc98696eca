//! Sync orchestration
//!
//! This module provides the core sync logic, including:
//! - Request parameters and data-type selection
//! - Sync coordination across consent, HMS and store
//! - Summary and reporting

pub mod coordinator;
pub mod request;
pub mod summary;

pub use coordinator::SyncCoordinator;
pub use request::SyncRequest;
pub use summary::{SyncSummary, TypeError, TypeSummary};
