//! PostgreSQL adapter implementing the storage traits
//!
//! Every batch runs in one transaction on one pooled connection. Patient
//! lookups happen inside the same transaction, so a record is either written
//! against a patient that exists at commit time or skipped.

use crate::adapters::database::traits::{
    ClinicalStore, ConsentStore, RecordOutcome, SkipReason, TriageEntry,
};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::models::ConsentAuditRow;
use crate::domain::{
    ConsentRecord, ConsentType, Diagnosis, InternalPatientId, LabResult, PatientId, Prescription,
    Result, SyncError,
};
use async_trait::async_trait;
use deadpool_postgres::Transaction;
use std::sync::Arc;

const LOOKUP_PATIENT: &str = "SELECT id FROM patients WHERE patient_id = $1";

const UPSERT_QUEUE: &str = r#"
    INSERT INTO patient_queue (patient_id, priority, triage_data, queue_position)
    VALUES ($1, $2, $3, nextval('patient_queue_position_seq'))
    ON CONFLICT (patient_id) DO UPDATE SET
        priority = EXCLUDED.priority,
        triage_data = EXCLUDED.triage_data,
        updated_at = NOW()
    RETURNING queue_position
"#;

const UPSERT_LAB_ORDER: &str = r#"
    INSERT INTO lab_orders (
        patient_id, external_order_id, test_name, test_code, results, result_numeric,
        reference_range, units, status, ordered_date, completed_date, ordered_by, resulted_by
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
    ON CONFLICT (patient_id, test_name, ordered_date) DO UPDATE SET
        results = EXCLUDED.results,
        result_numeric = EXCLUDED.result_numeric,
        reference_range = EXCLUDED.reference_range,
        units = EXCLUDED.units,
        status = EXCLUDED.status,
        completed_date = EXCLUDED.completed_date,
        resulted_by = EXCLUDED.resulted_by,
        updated_at = NOW()
"#;

const INSERT_PRESCRIPTION: &str = r#"
    INSERT INTO prescriptions (
        patient_id, encounter_id, medication_name, medication_code, dosage, frequency,
        duration, quantity, instructions, prescribed_date, prescribed_by, status
    )
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
"#;

const INSERT_CONSULTATION: &str = r#"
    INSERT INTO consultations (
        patient_id, encounter_id, consultation_type, diagnosis_code, diagnosis_name,
        diagnosis_type, diagnosis_status, diagnosed_date, diagnosed_by
    )
    VALUES ($1, $2, 'hms_sync', $3, $4, $5, $6, $7, $8)
"#;

const INSERT_AUDIT_LOG: &str = r#"
    INSERT INTO audit_logs (action, patient_id, details, receipt, created_at)
    VALUES ($1, $2, $3, $4, $5)
"#;

const LATEST_CONSENT: &str = r#"
    SELECT action, patient_id, details, receipt, created_at
    FROM audit_logs
    WHERE patient_id = $1 AND action = $2
    ORDER BY created_at DESC, id DESC
    LIMIT 1
"#;

fn db_error(context: &'static str) -> impl Fn(tokio_postgres::Error) -> SyncError {
    move |e| SyncError::Persistence(format!("{context}: {e}"))
}

async fn lookup_in(
    tx: &Transaction<'_>,
    patient_id: &PatientId,
) -> Result<Option<InternalPatientId>> {
    let row = tx
        .query_opt(LOOKUP_PATIENT, &[&patient_id.as_str()])
        .await
        .map_err(db_error("Patient lookup failed"))?;
    Ok(row.map(|row| InternalPatientId::new(row.get(0))))
}

fn skipped() -> RecordOutcome {
    RecordOutcome::Skipped {
        reason: SkipReason::PatientNotFound,
    }
}

fn stored(internal_id: InternalPatientId) -> RecordOutcome {
    RecordOutcome::Stored {
        internal_id,
        queue_position: None,
    }
}

/// PostgreSQL implementation of the storage traits
pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn new_with_arc(client: Arc<PostgreSQLClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl ClinicalStore for PostgreSQLAdapter {
    fn backend_name(&self) -> &'static str {
        "postgresql"
    }

    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.client.ensure_schema().await
    }

    async fn lookup_patient(&self, patient_id: &PatientId) -> Result<Option<InternalPatientId>> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_opt(LOOKUP_PATIENT, &[&patient_id.as_str()])
            .await
            .map_err(db_error("Patient lookup failed"))?;
        Ok(row.map(|row| InternalPatientId::new(row.get(0))))
    }

    async fn upsert_vitals(&self, entries: Vec<TriageEntry>) -> Result<Vec<RecordOutcome>> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(db_error("Failed to begin transaction"))?;
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in &entries {
            let Some(internal_id) = lookup_in(&tx, &entry.patient_id).await? else {
                outcomes.push(skipped());
                continue;
            };

            let row = tx
                .query_one(
                    UPSERT_QUEUE,
                    &[&internal_id.value(), &entry.priority, &entry.triage_data],
                )
                .await
                .map_err(db_error("Queue upsert failed"))?;

            outcomes.push(RecordOutcome::Stored {
                internal_id,
                queue_position: Some(row.get(0)),
            });
        }

        tx.commit().await.map_err(db_error("Failed to commit vitals batch"))?;
        Ok(outcomes)
    }

    async fn upsert_lab_results(&self, results: Vec<LabResult>) -> Result<Vec<RecordOutcome>> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(db_error("Failed to begin transaction"))?;
        let mut outcomes = Vec::with_capacity(results.len());

        for result in &results {
            let Some(internal_id) = lookup_in(&tx, &result.patient_id).await? else {
                outcomes.push(skipped());
                continue;
            };

            tx.execute(
                UPSERT_LAB_ORDER,
                &[
                    &internal_id.value(),
                    &result.order_id,
                    &result.test_name,
                    &result.test_code,
                    &result.result_value,
                    &result.result_numeric,
                    &result.reference_range,
                    &result.units,
                    &result.status.as_str(),
                    &result.ordered_date,
                    &result.result_date,
                    &result.ordered_by,
                    &result.resulted_by,
                ],
            )
            .await
            .map_err(db_error("Lab order upsert failed"))?;

            outcomes.push(stored(internal_id));
        }

        tx.commit().await.map_err(db_error("Failed to commit lab batch"))?;
        Ok(outcomes)
    }

    async fn insert_prescriptions(
        &self,
        prescriptions: Vec<Prescription>,
    ) -> Result<Vec<RecordOutcome>> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(db_error("Failed to begin transaction"))?;
        let mut outcomes = Vec::with_capacity(prescriptions.len());

        for prescription in &prescriptions {
            let Some(internal_id) = lookup_in(&tx, &prescription.patient_id).await? else {
                outcomes.push(skipped());
                continue;
            };

            tx.execute(
                INSERT_PRESCRIPTION,
                &[
                    &internal_id.value(),
                    &prescription.encounter_id,
                    &prescription.medication_name,
                    &prescription.medication_code,
                    &prescription.dosage,
                    &prescription.frequency,
                    &prescription.duration,
                    &prescription.quantity,
                    &prescription.instructions,
                    &prescription.prescribed_date,
                    &prescription.prescribed_by,
                    &prescription.status.as_str(),
                ],
            )
            .await
            .map_err(db_error("Prescription insert failed"))?;

            outcomes.push(stored(internal_id));
        }

        tx.commit().await.map_err(db_error("Failed to commit prescription batch"))?;
        Ok(outcomes)
    }

    async fn insert_diagnoses(&self, diagnoses: Vec<Diagnosis>) -> Result<Vec<RecordOutcome>> {
        let mut conn = self.client.get_connection().await?;
        let tx = conn.transaction().await.map_err(db_error("Failed to begin transaction"))?;
        let mut outcomes = Vec::with_capacity(diagnoses.len());

        for diagnosis in &diagnoses {
            let Some(internal_id) = lookup_in(&tx, &diagnosis.patient_id).await? else {
                outcomes.push(skipped());
                continue;
            };

            tx.execute(
                INSERT_CONSULTATION,
                &[
                    &internal_id.value(),
                    &diagnosis.encounter_id,
                    &diagnosis.diagnosis_code,
                    &diagnosis.diagnosis_name,
                    &diagnosis.diagnosis_type.as_str(),
                    &diagnosis.status.as_str(),
                    &diagnosis.diagnosed_date,
                    &diagnosis.diagnosed_by,
                ],
            )
            .await
            .map_err(db_error("Consultation insert failed"))?;

            outcomes.push(stored(internal_id));
        }

        tx.commit().await.map_err(db_error("Failed to commit diagnosis batch"))?;
        Ok(outcomes)
    }
}

#[async_trait]
impl ConsentStore for PostgreSQLAdapter {
    async fn append_consent(&self, record: &ConsentRecord) -> Result<()> {
        let row = ConsentAuditRow::from_record(record)?;
        let conn = self.client.get_connection().await?;

        conn.execute(
            INSERT_AUDIT_LOG,
            &[
                &row.action,
                &row.patient_id,
                &row.details,
                &row.receipt,
                &row.created_at,
            ],
        )
        .await
        .map_err(db_error("Consent audit insert failed"))?;

        Ok(())
    }

    async fn latest_consent(
        &self,
        patient_id: &PatientId,
        consent_type: ConsentType,
    ) -> Result<Option<ConsentRecord>> {
        let conn = self.client.get_connection().await?;
        let row = conn
            .query_opt(LATEST_CONSENT, &[&patient_id.as_str(), &consent_type.audit_action()])
            .await
            .map_err(db_error("Consent lookup failed"))?;

        row.map(|row| {
            ConsentAuditRow {
                action: row.get("action"),
                patient_id: row.get("patient_id"),
                details: row.get("details"),
                receipt: row.get("receipt"),
                created_at: row.get("created_at"),
            }
            .into_record()
        })
        .transpose()
    }
}
