//! Storage abstraction layer
//!
//! This module provides a trait-based abstraction over the target store,
//! allowing the engine to write to PostgreSQL or to the in-memory backend.

pub mod factory;
pub mod traits;

pub use factory::{create_stores, Stores};
pub use traits::{ClinicalStore, ConsentStore, RecordOutcome, SkipReason, TriageEntry};
