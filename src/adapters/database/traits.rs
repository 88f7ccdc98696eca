//! Storage abstraction traits
//!
//! This module defines the traits a target store must implement to receive
//! synchronized records and consent receipts.

use crate::domain::{
    ConsentRecord, ConsentType, Diagnosis, InternalPatientId, LabResult, PatientId, Prescription,
    Result, SyncError,
};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// A vitals reading ready for the patient queue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriageEntry {
    pub patient_id: PatientId,

    /// routine, semi_urgent or urgent
    pub priority: String,

    /// Vital signs and provenance stored alongside the queue row
    pub triage_data: Value,
}

/// Why a record was skipped without failing its batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    PatientNotFound,
}

impl SkipReason {
    /// The record-level error this skip recovers from
    pub fn to_error(&self, patient_id: &PatientId) -> SyncError {
        match self {
            SkipReason::PatientNotFound => SyncError::PatientNotFound(patient_id.to_string()),
        }
    }
}

/// Outcome of one record inside a committed batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum RecordOutcome {
    /// Written under the given internal patient id
    Stored {
        internal_id: InternalPatientId,
        /// Queue position, for vitals only
        queue_position: Option<i64>,
    },
    /// Left out of the batch; the rest of the batch was still written
    Skipped { reason: SkipReason },
}

impl RecordOutcome {
    pub fn is_stored(&self) -> bool {
        matches!(self, RecordOutcome::Stored { .. })
    }
}

/// Clinical record store
///
/// Each batch method runs inside one transaction. The returned outcomes line
/// up one-to-one with the input records. An `Err` means the whole batch was
/// rolled back and nothing from it was written.
#[async_trait]
pub trait ClinicalStore: Send + Sync {
    /// Short name for logs and `status` output
    fn backend_name(&self) -> &'static str;

    /// Test the store connection
    async fn test_connection(&self) -> Result<()>;

    /// Create tables, sequences and indexes if they do not exist
    async fn ensure_schema(&self) -> Result<()>;

    /// Resolve an external patient id to the store's internal key
    async fn lookup_patient(&self, patient_id: &PatientId) -> Result<Option<InternalPatientId>>;

    /// Upsert queue rows, one active row per patient (last write wins)
    ///
    /// New rows take their position from an atomic sequence; a patient
    /// already queued keeps its position.
    async fn upsert_vitals(&self, entries: Vec<TriageEntry>) -> Result<Vec<RecordOutcome>>;

    /// Upsert lab results keyed by (patient, test_name, ordered_date)
    async fn upsert_lab_results(&self, results: Vec<LabResult>) -> Result<Vec<RecordOutcome>>;

    /// Append prescriptions
    async fn insert_prescriptions(
        &self,
        prescriptions: Vec<Prescription>,
    ) -> Result<Vec<RecordOutcome>>;

    /// Append diagnoses
    async fn insert_diagnoses(&self, diagnoses: Vec<Diagnosis>) -> Result<Vec<RecordOutcome>>;
}

/// Append-only consent audit log
#[async_trait]
pub trait ConsentStore: Send + Sync {
    /// Append a consent record; existing entries are never modified
    async fn append_consent(&self, record: &ConsentRecord) -> Result<()>;

    /// Most recently granted consent of the given type for a patient
    async fn latest_consent(
        &self,
        patient_id: &PatientId,
        consent_type: ConsentType,
    ) -> Result<Option<ConsentRecord>>;
}
