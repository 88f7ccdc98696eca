//! Sync summary and reporting
//!
//! This module defines structures for tracking and reporting sync results.
//! Counts are kept per data type so partial success stays visible.

use crate::adapters::hms::{Fetched, PatientFailure};
use crate::core::persistence::StoreReport;
use crate::domain::{DataType, PatientId, SyncError};
use std::time::Duration;
use uuid::Uuid;

/// Why a data type did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeError {
    /// Error category, see [`SyncError::kind`]
    pub kind: &'static str,

    pub message: String,
}

impl From<&SyncError> for TypeError {
    fn from(error: &SyncError) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Counts for one data type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSummary {
    pub data_type: DataType,

    /// Records mapped and inside the date window
    pub fetched: usize,

    /// Records skipped because they could not be mapped
    pub malformed: usize,

    /// Records dropped because they fell outside the date window
    pub out_of_range: usize,

    /// Records the sync tried to store, including malformed ones
    pub attempted: usize,

    pub stored: usize,

    /// Records skipped by the store, for example unknown patients
    pub skipped: usize,

    pub error: Option<TypeError>,

    /// Patients whose fetch failed; records of the others were still stored
    pub failed_patients: Vec<PatientFailure>,

    /// The type was never started because shutdown was requested
    pub cancelled: bool,
}

impl TypeSummary {
    pub fn new(data_type: DataType) -> Self {
        Self {
            data_type,
            fetched: 0,
            malformed: 0,
            out_of_range: 0,
            attempted: 0,
            stored: 0,
            skipped: 0,
            error: None,
            failed_patients: Vec::new(),
            cancelled: false,
        }
    }

    pub fn cancelled(data_type: DataType) -> Self {
        let error = SyncError::Cancelled(format!("shutdown requested before {data_type} started"));
        Self {
            error: Some(TypeError::from(&error)),
            cancelled: true,
            ..Self::new(data_type)
        }
    }

    pub fn record_fetch<T>(&mut self, fetched: &Fetched<T>) {
        self.fetched = fetched.records.len();
        self.malformed = fetched.malformed;
        self.out_of_range = fetched.out_of_range;
        self.attempted = fetched.records.len() + fetched.malformed;
        self.failed_patients = fetched.failed_patients.clone();
    }

    pub fn record_store(&mut self, report: &StoreReport) {
        self.stored = report.stored;
        self.skipped = report.skipped;
    }

    pub fn fail(&mut self, error: &SyncError) {
        self.error = Some(TypeError::from(error));
    }

    /// No error, no failed patients and not cancelled
    pub fn is_complete(&self) -> bool {
        self.error.is_none() && self.failed_patients.is_empty() && !self.cancelled
    }
}

/// Summary of one sync request
#[derive(Debug, Clone)]
pub struct SyncSummary {
    pub sync_id: Uuid,

    /// HMS system type as given in the credentials
    pub system: String,

    pub patients_requested: usize,

    /// Patients that passed the consent gate
    pub patients_synced: usize,

    /// Patients excluded by the consent gate
    pub denied_patients: Vec<PatientId>,

    /// One entry per requested data type, in processing order
    pub types: Vec<TypeSummary>,

    pub duration: Duration,
}

impl SyncSummary {
    /// Create a new empty summary
    pub fn new(sync_id: Uuid, system: impl Into<String>) -> Self {
        Self {
            sync_id,
            system: system.into(),
            patients_requested: 0,
            patients_synced: 0,
            denied_patients: Vec::new(),
            types: Vec::new(),
            duration: Duration::from_secs(0),
        }
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn add_type(&mut self, summary: TypeSummary) {
        self.types.push(summary);
    }

    pub fn type_summary(&self, data_type: DataType) -> Option<&TypeSummary> {
        self.types.iter().find(|t| t.data_type == data_type)
    }

    pub fn total_stored(&self) -> usize {
        self.types.iter().map(|t| t.stored).sum()
    }

    pub fn total_attempted(&self) -> usize {
        self.types.iter().map(|t| t.attempted).sum()
    }

    /// Every requested data type finished without error
    pub fn is_successful(&self) -> bool {
        self.types.iter().all(TypeSummary::is_complete)
    }

    pub fn was_cancelled(&self) -> bool {
        self.types.iter().any(|t| t.cancelled)
    }

    /// Stored records as a percentage of attempted ones
    pub fn success_rate(&self) -> f64 {
        let attempted = self.total_attempted();
        if attempted == 0 {
            return 100.0;
        }
        (self.total_stored() as f64 / attempted as f64) * 100.0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        crate::log_sync_complete!(
            self.sync_id,
            self.total_stored(),
            self.total_attempted(),
            self.duration
        );

        tracing::info!(
            sync_id = %self.sync_id,
            system = %self.system,
            patients_requested = self.patients_requested,
            patients_synced = self.patients_synced,
            patients_denied = self.denied_patients.len(),
            success_rate = format!("{:.2}%", self.success_rate()),
            "Sync summary"
        );

        for t in &self.types {
            tracing::info!(
                sync_id = %self.sync_id,
                data_type = %t.data_type,
                fetched = t.fetched,
                malformed = t.malformed,
                out_of_range = t.out_of_range,
                stored = t.stored,
                skipped = t.skipped,
                failed_patients = t.failed_patients.len(),
                cancelled = t.cancelled,
                "Data type summary"
            );
            for failure in &t.failed_patients {
                tracing::warn!(
                    sync_id = %self.sync_id,
                    data_type = %t.data_type,
                    patient_id = %failure.patient_id,
                    error_kind = failure.kind,
                    message = %failure.message,
                    "Patient not synchronized"
                );
            }
            if let Some(error) = t.error.as_ref().filter(|_| !t.cancelled) {
                tracing::warn!(
                    sync_id = %self.sync_id,
                    data_type = %t.data_type,
                    error_kind = error.kind,
                    message = %error.message,
                    "Data type failed"
                );
            }
        }
    }
}

impl Default for SyncSummary {
    fn default() -> Self {
        Self::new(Uuid::new_v4(), "")
    }
}
