//! In-process clinical and consent store
//!
//! Holds the same tables as the PostgreSQL schema behind one async mutex.
//! Every batch is applied to a staged copy of the state and swapped in only
//! when the whole batch succeeds, which mirrors transaction rollback. The
//! queue position counter lives outside the staged state, so like a
//! database sequence it never goes backwards after a rollback.

use crate::adapters::database::traits::{
    ClinicalStore, ConsentStore, RecordOutcome, SkipReason, TriageEntry,
};
use crate::domain::{
    ConsentRecord, ConsentType, Diagnosis, InternalPatientId, LabResult, PatientId, Prescription,
    Result, SyncError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::Mutex;

/// Row of the patient queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueueRow {
    pub patient_id: InternalPatientId,
    pub priority: String,
    pub triage_data: Value,
    pub queue_position: i64,
    pub updated_at: DateTime<Utc>,
}

/// Row of the lab orders table
#[derive(Debug, Clone, PartialEq)]
pub struct LabOrderRow {
    pub id: i64,
    pub patient_id: InternalPatientId,
    pub result: LabResult,
    pub completed_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrescriptionRow {
    pub id: i64,
    pub patient_id: InternalPatientId,
    pub prescription: Prescription,
}

/// Row of the consultations table, where diagnoses land
#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationRow {
    pub id: i64,
    pub patient_id: InternalPatientId,
    pub diagnosis: Diagnosis,
}

#[derive(Debug, Clone, Default)]
struct State {
    patients: HashMap<PatientId, InternalPatientId>,
    queue: HashMap<InternalPatientId, QueueRow>,
    lab_orders: Vec<LabOrderRow>,
    prescriptions: Vec<PrescriptionRow>,
    consultations: Vec<ConsultationRow>,
    consents: Vec<ConsentRecord>,
    next_row_id: i64,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_row_id += 1;
        self.next_row_id
    }
}

/// Memory-backed implementation of [`ClinicalStore`] and [`ConsentStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    queue_sequence: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a patient and returns its internal id
    ///
    /// Registering an already known patient returns the existing id.
    pub async fn register_patient(&self, patient_id: &PatientId) -> InternalPatientId {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.patients.get(patient_id) {
            return *existing;
        }
        let internal = InternalPatientId::new(state.next_id());
        state.patients.insert(patient_id.clone(), internal);
        internal
    }

    pub async fn queue_rows(&self) -> Vec<QueueRow> {
        let state = self.state.lock().await;
        let mut rows: Vec<QueueRow> = state.queue.values().cloned().collect();
        rows.sort_by_key(|row| row.queue_position);
        rows
    }

    pub async fn lab_orders(&self) -> Vec<LabOrderRow> {
        self.state.lock().await.lab_orders.clone()
    }

    pub async fn prescriptions(&self) -> Vec<PrescriptionRow> {
        self.state.lock().await.prescriptions.clone()
    }

    pub async fn consultations(&self) -> Vec<ConsultationRow> {
        self.state.lock().await.consultations.clone()
    }

    pub async fn consents(&self) -> Vec<ConsentRecord> {
        self.state.lock().await.consents.clone()
    }

    /// Applies `apply` to every record against a staged copy of the state
    ///
    /// The staged copy replaces the live state only if every record succeeds.
    async fn transaction<T, F>(&self, records: Vec<T>, mut apply: F) -> Result<Vec<RecordOutcome>>
    where
        T: Send,
        F: FnMut(&mut State, InternalPatientId, T) -> Result<RecordOutcome> + Send,
        T: PatientKeyed,
    {
        let mut live = self.state.lock().await;
        let mut staged = live.clone();
        let mut outcomes = Vec::with_capacity(records.len());

        for record in records {
            let Some(internal_id) = staged.patients.get(record.patient_key()).copied() else {
                outcomes.push(RecordOutcome::Skipped {
                    reason: SkipReason::PatientNotFound,
                });
                continue;
            };
            outcomes.push(apply(&mut staged, internal_id, record)?);
        }

        *live = staged;
        Ok(outcomes)
    }
}

/// Records that name the patient they belong to
trait PatientKeyed {
    fn patient_key(&self) -> &PatientId;
}

impl PatientKeyed for TriageEntry {
    fn patient_key(&self) -> &PatientId {
        &self.patient_id
    }
}

impl PatientKeyed for LabResult {
    fn patient_key(&self) -> &PatientId {
        &self.patient_id
    }
}

impl PatientKeyed for Prescription {
    fn patient_key(&self) -> &PatientId {
        &self.patient_id
    }
}

impl PatientKeyed for Diagnosis {
    fn patient_key(&self) -> &PatientId {
        &self.patient_id
    }
}

#[async_trait]
impl ClinicalStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        Ok(())
    }

    async fn lookup_patient(&self, patient_id: &PatientId) -> Result<Option<InternalPatientId>> {
        Ok(self.state.lock().await.patients.get(patient_id).copied())
    }

    async fn upsert_vitals(&self, entries: Vec<TriageEntry>) -> Result<Vec<RecordOutcome>> {
        let sequence = &self.queue_sequence;
        self.transaction(entries, |state, internal_id, entry| {
            let now = Utc::now();
            let queue_position = match state.queue.get_mut(&internal_id) {
                Some(row) => {
                    row.priority = entry.priority;
                    row.triage_data = entry.triage_data;
                    row.updated_at = now;
                    row.queue_position
                }
                None => {
                    let position = sequence.fetch_add(1, Ordering::SeqCst) + 1;
                    state.queue.insert(
                        internal_id,
                        QueueRow {
                            patient_id: internal_id,
                            priority: entry.priority,
                            triage_data: entry.triage_data,
                            queue_position: position,
                            updated_at: now,
                        },
                    );
                    position
                }
            };
            Ok(RecordOutcome::Stored {
                internal_id,
                queue_position: Some(queue_position),
            })
        })
        .await
    }

    async fn upsert_lab_results(&self, results: Vec<LabResult>) -> Result<Vec<RecordOutcome>> {
        self.transaction(results, |state, internal_id, result| {
            if result.test_name.trim().is_empty() {
                return Err(SyncError::Persistence(
                    "lab_orders: test_name must not be empty".to_string(),
                ));
            }

            let completed_date = result.result_date;
            let existing = state.lab_orders.iter_mut().find(|row| {
                row.patient_id == internal_id
                    && row.result.test_name == result.test_name
                    && row.result.ordered_date == result.ordered_date
            });

            match existing {
                Some(row) => {
                    row.result.result_value = result.result_value;
                    row.result.result_numeric = result.result_numeric;
                    row.result.reference_range = result.reference_range;
                    row.result.units = result.units;
                    row.result.status = result.status;
                    row.result.result_date = result.result_date;
                    row.result.resulted_by = result.resulted_by;
                    row.completed_date = completed_date;
                }
                None => {
                    let id = state.next_id();
                    state.lab_orders.push(LabOrderRow {
                        id,
                        patient_id: internal_id,
                        result,
                        completed_date,
                    });
                }
            }

            Ok(RecordOutcome::Stored {
                internal_id,
                queue_position: None,
            })
        })
        .await
    }

    async fn insert_prescriptions(
        &self,
        prescriptions: Vec<Prescription>,
    ) -> Result<Vec<RecordOutcome>> {
        self.transaction(prescriptions, |state, internal_id, prescription| {
            let id = state.next_id();
            state.prescriptions.push(PrescriptionRow {
                id,
                patient_id: internal_id,
                prescription,
            });
            Ok(RecordOutcome::Stored {
                internal_id,
                queue_position: None,
            })
        })
        .await
    }

    async fn insert_diagnoses(&self, diagnoses: Vec<Diagnosis>) -> Result<Vec<RecordOutcome>> {
        self.transaction(diagnoses, |state, internal_id, diagnosis| {
            let id = state.next_id();
            state.consultations.push(ConsultationRow {
                id,
                patient_id: internal_id,
                diagnosis,
            });
            Ok(RecordOutcome::Stored {
                internal_id,
                queue_position: None,
            })
        })
        .await
    }
}

#[async_trait]
impl ConsentStore for MemoryStore {
    async fn append_consent(&self, record: &ConsentRecord) -> Result<()> {
        self.state.lock().await.consents.push(record.clone());
        Ok(())
    }

    async fn latest_consent(
        &self,
        patient_id: &PatientId,
        consent_type: ConsentType,
    ) -> Result<Option<ConsentRecord>> {
        let state = self.state.lock().await;
        Ok(state
            .consents
            .iter()
            .filter(|record| {
                &record.patient_id == patient_id && record.consent_type == consent_type
            })
            .max_by_key(|record| record.granted_at)
            .cloned())
    }
}
