//! Sync coordinator - main orchestrator for one sync request
//!
//! This module coordinates a sync: consent screening, client creation and
//! authentication, then fetch, classify and persist for each requested data
//! type. A failure in one data type is recorded in the summary and the next
//! type is still attempted.

use crate::adapters::database::{create_stores, Stores};
use crate::adapters::hms::{create_hms_client, HmsClient};
use crate::config::SyncConfig;
use crate::core::consent::ConsentGate;
use crate::core::persistence::{PersistenceMapper, RecordBatch};
use crate::core::sync::request::SyncRequest;
use crate::core::sync::summary::{SyncSummary, TypeSummary};
use crate::domain::{DataType, DateRange, PatientId, Result, SyncError};
use crate::log_sync_start;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use uuid::Uuid;

/// Sync coordinator
pub struct SyncCoordinator {
    config: SyncConfig,
    gate: ConsentGate,
    mapper: PersistenceMapper,
    shutdown_signal: watch::Receiver<bool>,
}

impl SyncCoordinator {
    /// Create a coordinator writing to the configured target store
    pub async fn new(config: SyncConfig, shutdown_signal: watch::Receiver<bool>) -> Result<Self> {
        let stores = create_stores(&config).await?;
        Ok(Self::with_stores(config, stores, shutdown_signal))
    }

    /// Create a coordinator over existing stores
    pub fn with_stores(
        config: SyncConfig,
        stores: Stores,
        shutdown_signal: watch::Receiver<bool>,
    ) -> Self {
        Self {
            gate: ConsentGate::new(stores.consent, config.consent.clone()),
            mapper: PersistenceMapper::new(stores.clinical),
            config,
            shutdown_signal,
        }
    }

    pub fn consent_gate(&self) -> &ConsentGate {
        &self.gate
    }

    /// Execute one sync request
    ///
    /// # Errors
    ///
    /// Request-level failures are returned as errors: an unsupported system
    /// or invalid credentials configuration, a consent denial when
    /// `denial_scope = abort_request`, and rejected credentials. Everything
    /// else is reported per data type in the summary.
    pub async fn sync(&self, request: SyncRequest) -> Result<SyncSummary> {
        let client = create_hms_client(&request.credentials, &self.config.hms)?;
        self.sync_with_client(client, request).await
    }

    /// Execute a sync against an already constructed client
    pub async fn sync_with_client(
        &self,
        mut client: Box<dyn HmsClient>,
        request: SyncRequest,
    ) -> Result<SyncSummary> {
        let start_time = Instant::now();
        let system = client.system();
        let mut summary = SyncSummary::new(Uuid::new_v4(), system.as_str());
        summary.patients_requested = request.patient_ids.len();

        log_sync_start!(summary.sync_id, system, request.patient_ids.len());

        let screening = self.gate.screen(&request.patient_ids).await?;
        summary.patients_synced = screening.allowed.len();
        summary.denied_patients = screening.denied;

        let data_types = request.data_types();

        if screening.allowed.is_empty() {
            tracing::info!(
                sync_id = %summary.sync_id,
                "No patients in scope, nothing to fetch"
            );
            for data_type in data_types {
                summary.add_type(TypeSummary::new(data_type));
            }
            return Ok(summary.with_duration(start_time.elapsed()));
        }

        if !client.authenticate().await? {
            tracing::error!(
                sync_id = %summary.sync_id,
                system = %system,
                base_url = %client.base_url(),
                "HMS authentication failed"
            );
            return Err(SyncError::Authentication {
                system: system.to_string(),
                message: "credentials were rejected or the login endpoint was unreachable"
                    .to_string(),
            });
        }

        let request_timeout = Duration::from_secs(self.config.hms.request_timeout_seconds);
        let deadline = tokio::time::Instant::now() + request_timeout;

        for data_type in data_types {
            if *self.shutdown_signal.borrow() {
                tracing::warn!(
                    sync_id = %summary.sync_id,
                    data_type = %data_type,
                    "Shutdown requested, not starting data type"
                );
                summary.add_type(TypeSummary::cancelled(data_type));
                continue;
            }

            let mut type_summary = TypeSummary::new(data_type);
            let outcome = tokio::time::timeout_at(
                deadline,
                self.sync_type(
                    client.as_ref(),
                    &mut type_summary,
                    &screening.allowed,
                    &request.date_range,
                ),
            )
            .await;

            let failure = match outcome {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(e),
                Err(_) => Some(SyncError::TransientNetwork(format!(
                    "request deadline of {}s exceeded",
                    request_timeout.as_secs()
                ))),
            };

            if let Some(e) = failure {
                tracing::error!(
                    sync_id = %summary.sync_id,
                    data_type = %data_type,
                    error_kind = e.kind(),
                    error = %e,
                    "Data type failed"
                );
                type_summary.fail(&e);
            }

            summary.add_type(type_summary);
        }

        let summary = summary.with_duration(start_time.elapsed());
        summary.log_summary();
        Ok(summary)
    }

    /// Fetch and persist one data type
    async fn sync_type(
        &self,
        client: &dyn HmsClient,
        summary: &mut TypeSummary,
        patient_ids: &[PatientId],
        range: &DateRange,
    ) -> Result<()> {
        let batch = match summary.data_type {
            DataType::Vitals => {
                let fetched = client.fetch_vitals(patient_ids, range).await?;
                summary.record_fetch(&fetched);
                RecordBatch::Vitals(fetched.records)
            }
            DataType::LabResults => {
                let fetched = client.fetch_lab_results(patient_ids, range).await?;
                summary.record_fetch(&fetched);
                RecordBatch::LabResults(fetched.records)
            }
            DataType::Prescriptions => {
                let fetched = client.fetch_prescriptions(patient_ids, range).await?;
                summary.record_fetch(&fetched);
                RecordBatch::Prescriptions(fetched.records)
            }
            DataType::Diagnoses => {
                let fetched = client.fetch_diagnoses(patient_ids, range).await?;
                summary.record_fetch(&fetched);
                RecordBatch::Diagnoses(fetched.records)
            }
        };

        tracing::debug!(
            data_type = %summary.data_type,
            records = batch.len(),
            "Persisting batch"
        );

        let report = self.mapper.store(batch).await?;
        summary.record_store(&report);
        Ok(())
    }
}
