//! Domain models and types for the synchronization engine.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`PatientId`], [`InternalPatientId`])
//! - **Canonical records** ([`VitalSigns`], [`LabResult`], [`Prescription`], [`Diagnosis`])
//! - **Consent records** ([`ConsentRecord`], [`ConsentGrant`], [`ConsentType`])
//! - **Error types** ([`SyncError`], [`HmsError`])
//! - **Result type alias** ([`Result`])
//!
//! # Type Safety
//!
//! External and internal patient identifiers are distinct types, so a raw
//! HMS identifier can never be written where a store key is expected:
//!
//! ```rust
//! use hms_sync::domain::{InternalPatientId, PatientId};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let external = PatientId::new("ERL-2024-0042")?;
//! let internal = InternalPatientId::new(42);
//!
//! // This won't compile
//! // let wrong: PatientId = internal;
//! # Ok(())
//! # }
//! ```
//!
//! # Timestamps
//!
//! All record timestamps are `DateTime<Utc>`. Source formats are normalized
//! by [`time::parse_timestamp`] before a record is constructed.

pub mod consent;
pub mod errors;
pub mod ids;
pub mod records;
pub mod result;
pub mod time;

// Re-export commonly used types for convenience
pub use consent::{compute_receipt, ConsentGrant, ConsentRecord, ConsentType};
pub use errors::{HmsError, SyncError};
pub use ids::{InternalPatientId, PatientId};
pub use records::{
    ClinicalRecord, DataType, Diagnosis, DiagnosisStatus, DiagnosisType, LabResult, LabStatus,
    Prescription, PrescriptionStatus, VitalSigns,
};
pub use result::Result;
pub use time::{parse_range_end, parse_timestamp, DateRange};
