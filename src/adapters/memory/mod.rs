//! In-memory storage backend
//!
//! Implements the storage traits with the same merge keys, batch rollback
//! and queue sequence as PostgreSQL. Used by tests and by
//! `database_target = "memory"` for dry local runs.

pub mod store;

pub use store::{ConsultationRow, LabOrderRow, MemoryStore, PrescriptionRow, QueueRow};
