//! Persistence mapper
//!
//! Turns canonical records into store writes. Vitals are classified and
//! become patient queue entries; the other record types are handed to the
//! store as they are. Each call is one store batch, so a persistence error
//! rolls back every record passed in that call.

use crate::adapters::database::{ClinicalStore, RecordOutcome, TriageEntry};
use crate::core::triage::classify_with_reasons;
use crate::domain::{
    ClinicalRecord, DataType, Diagnosis, LabResult, PatientId, Prescription, Result, VitalSigns,
};
use crate::log_record_skipped;
use serde_json::{json, Value};
use std::sync::Arc;

/// Provenance tag stored with every queue entry written by a sync
pub const SYNC_SOURCE: &str = "hms_integration";

/// A batch of records of one type
#[derive(Debug, Clone, PartialEq)]
pub enum RecordBatch {
    Vitals(Vec<VitalSigns>),
    LabResults(Vec<LabResult>),
    Prescriptions(Vec<Prescription>),
    Diagnoses(Vec<Diagnosis>),
}

impl RecordBatch {
    pub fn data_type(&self) -> DataType {
        match self {
            RecordBatch::Vitals(_) => DataType::Vitals,
            RecordBatch::LabResults(_) => DataType::LabResults,
            RecordBatch::Prescriptions(_) => DataType::Prescriptions,
            RecordBatch::Diagnoses(_) => DataType::Diagnoses,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Vitals(records) => records.len(),
            RecordBatch::LabResults(records) => records.len(),
            RecordBatch::Prescriptions(records) => records.len(),
            RecordBatch::Diagnoses(records) => records.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of one committed batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreReport {
    pub data_type: DataType,
    pub attempted: usize,
    pub stored: usize,
    pub skipped: usize,
    /// One outcome per record, in the order the records were written
    pub outcomes: Vec<RecordOutcome>,
}

impl StoreReport {
    pub fn empty(data_type: DataType) -> Self {
        Self {
            data_type,
            attempted: 0,
            stored: 0,
            skipped: 0,
            outcomes: Vec::new(),
        }
    }

    fn from_outcomes(
        data_type: DataType,
        patient_ids: &[PatientId],
        outcomes: Vec<RecordOutcome>,
    ) -> Self {
        for (patient_id, outcome) in patient_ids.iter().zip(&outcomes) {
            if let RecordOutcome::Skipped { reason } = outcome {
                log_record_skipped!(data_type, patient_id, reason.to_error(patient_id));
            }
        }

        let stored = outcomes.iter().filter(|o| o.is_stored()).count();
        Self {
            data_type,
            attempted: outcomes.len(),
            stored,
            skipped: outcomes.len() - stored,
            outcomes,
        }
    }
}

/// Writes canonical records to a [`ClinicalStore`]
pub struct PersistenceMapper {
    store: Arc<dyn ClinicalStore>,
}

impl PersistenceMapper {
    pub fn new(store: Arc<dyn ClinicalStore>) -> Self {
        Self { store }
    }

    /// Store any batch
    pub async fn store(&self, batch: RecordBatch) -> Result<StoreReport> {
        match batch {
            RecordBatch::Vitals(records) => self.store_vitals(records).await,
            RecordBatch::LabResults(records) => self.store_lab_results(records).await,
            RecordBatch::Prescriptions(records) => self.store_prescriptions(records).await,
            RecordBatch::Diagnoses(records) => self.store_diagnoses(records).await,
        }
    }

    /// Classify each reading and upsert it into the patient queue
    ///
    /// Readings are written oldest first, so when a batch holds several
    /// readings for one patient the newest decides the queue entry.
    pub async fn store_vitals(&self, mut vitals: Vec<VitalSigns>) -> Result<StoreReport> {
        if vitals.is_empty() {
            return Ok(StoreReport::empty(DataType::Vitals));
        }

        vitals.sort_by_key(|v| v.timestamp);
        let patient_ids = patient_ids(&vitals);
        let entries = vitals.iter().map(triage_entry).collect::<Result<Vec<_>>>()?;

        let outcomes = self.store.upsert_vitals(entries).await?;
        Ok(StoreReport::from_outcomes(DataType::Vitals, &patient_ids, outcomes))
    }

    /// Upsert lab results on (patient, test_name, ordered_date)
    pub async fn store_lab_results(&self, results: Vec<LabResult>) -> Result<StoreReport> {
        if results.is_empty() {
            return Ok(StoreReport::empty(DataType::LabResults));
        }

        let patient_ids = patient_ids(&results);
        let outcomes = self.store.upsert_lab_results(results).await?;
        Ok(StoreReport::from_outcomes(DataType::LabResults, &patient_ids, outcomes))
    }

    /// Append prescriptions; syncing the same window twice duplicates them
    pub async fn store_prescriptions(
        &self,
        prescriptions: Vec<Prescription>,
    ) -> Result<StoreReport> {
        if prescriptions.is_empty() {
            return Ok(StoreReport::empty(DataType::Prescriptions));
        }

        let patient_ids = patient_ids(&prescriptions);
        let outcomes = self.store.insert_prescriptions(prescriptions).await?;
        Ok(StoreReport::from_outcomes(DataType::Prescriptions, &patient_ids, outcomes))
    }

    /// Append diagnoses as consultations
    pub async fn store_diagnoses(&self, diagnoses: Vec<Diagnosis>) -> Result<StoreReport> {
        if diagnoses.is_empty() {
            return Ok(StoreReport::empty(DataType::Diagnoses));
        }

        let patient_ids = patient_ids(&diagnoses);
        let outcomes = self.store.insert_diagnoses(diagnoses).await?;
        Ok(StoreReport::from_outcomes(DataType::Diagnoses, &patient_ids, outcomes))
    }
}

fn patient_ids<T: ClinicalRecord>(records: &[T]) -> Vec<PatientId> {
    records.iter().map(|r| r.patient_id().clone()).collect()
}

/// Queue entry for one reading
pub fn triage_entry(vitals: &VitalSigns) -> Result<TriageEntry> {
    let (priority, reasons) = classify_with_reasons(vitals);

    let triage_data: Value = json!({
        "vital_signs": serde_json::to_value(vitals)?,
        "effective_bmi": vitals.effective_bmi(),
        "priority_reasons": reasons,
        "recorded_at": vitals.timestamp,
        "recorded_by": vitals.recorded_by,
        "encounter_id": vitals.encounter_id,
        "sync_source": SYNC_SOURCE,
    });

    Ok(TriageEntry {
        patient_id: vitals.patient_id.clone(),
        priority: priority.as_str().to_string(),
        triage_data,
    })
}
