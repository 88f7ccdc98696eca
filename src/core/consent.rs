//! Consent gate
//!
//! Every patient passes through [`ConsentGate::verify`] before anything is
//! fetched or written for them. Grants are recorded with
//! [`ConsentGate::log`], which appends to the consent audit log and returns
//! the receipt.

use crate::adapters::database::ConsentStore;
use crate::config::{ConsentConfig, DenialScope, MissingConsentPolicy};
use crate::domain::{ConsentGrant, ConsentRecord, ConsentType, PatientId, Result, SyncError};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Patients split by the outcome of their consent check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsentScreening {
    pub allowed: Vec<PatientId>,
    pub denied: Vec<PatientId>,
}

/// Consent verification and receipt logging
pub struct ConsentGate {
    store: Arc<dyn ConsentStore>,
    config: ConsentConfig,
}

impl ConsentGate {
    pub fn new(store: Arc<dyn ConsentStore>, config: ConsentConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ConsentConfig {
        &self.config
    }

    /// Whether the patient currently grants `consent_type`
    ///
    /// The most recent grant decides. It must not have expired and must be
    /// younger than `max_age_days`; otherwise the patient is treated as
    /// having no consent on file and the missing-consent policy applies.
    /// A failing store lookup denies.
    pub async fn verify(&self, patient_id: &PatientId, consent_type: ConsentType) -> bool {
        self.verify_at(patient_id, consent_type, Utc::now()).await
    }

    pub async fn verify_at(
        &self,
        patient_id: &PatientId,
        consent_type: ConsentType,
        now: DateTime<Utc>,
    ) -> bool {
        let latest = match self.store.latest_consent(patient_id, consent_type).await {
            Ok(latest) => latest,
            Err(e) => {
                tracing::error!(
                    patient_id = %patient_id,
                    consent_type = %consent_type,
                    error = %e,
                    "Consent lookup failed, denying"
                );
                return false;
            }
        };

        let Some(record) = latest.filter(|record| self.within_max_age(record, now)) else {
            let allowed = self.config.missing_consent == MissingConsentPolicy::Allow;
            tracing::debug!(
                patient_id = %patient_id,
                consent_type = %consent_type,
                allowed,
                "No usable consent on file"
            );
            return allowed;
        };

        let active = record.is_active_at(now);
        if !active {
            tracing::debug!(
                patient_id = %patient_id,
                consent_type = %consent_type,
                receipt = %record.receipt,
                "Consent has expired"
            );
        }
        active
    }

    /// Append a consent grant and return its receipt
    pub async fn log(
        &self,
        patient_id: &PatientId,
        consent_type: ConsentType,
        grant: ConsentGrant,
    ) -> Result<String> {
        if grant.granted_by.trim().is_empty() {
            return Err(SyncError::Validation(
                "granted_by is required to log consent".to_string(),
            ));
        }

        let record = ConsentRecord::issue(patient_id.clone(), consent_type, grant, Utc::now());
        self.store.append_consent(&record).await?;

        tracing::info!(
            patient_id = %patient_id,
            consent_type = %consent_type,
            receipt = %record.receipt,
            "Consent logged"
        );

        Ok(record.receipt)
    }

    /// Check every patient against the configured consent type
    ///
    /// With `denial_scope = abort_request` the first denial fails the whole
    /// call with [`SyncError::ConsentDenied`].
    pub async fn screen(&self, patient_ids: &[PatientId]) -> Result<ConsentScreening> {
        let consent_type = self.config.consent_type;
        let mut screening = ConsentScreening::default();

        for patient_id in patient_ids {
            if self.verify(patient_id, consent_type).await {
                screening.allowed.push(patient_id.clone());
                continue;
            }

            tracing::warn!(
                patient_id = %patient_id,
                consent_type = %consent_type,
                "Consent denied"
            );

            if self.config.denial_scope == DenialScope::AbortRequest {
                return Err(SyncError::ConsentDenied {
                    patient_id: patient_id.to_string(),
                    consent_type: consent_type.to_string(),
                });
            }
            screening.denied.push(patient_id.clone());
        }

        Ok(screening)
    }

    fn within_max_age(&self, record: &ConsentRecord, now: DateTime<Utc>) -> bool {
        if self.config.max_age_days == 0 {
            return true;
        }
        now - record.granted_at <= Duration::days(i64::from(self.config.max_age_days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use async_trait::async_trait;

    fn patient(id: &str) -> PatientId {
        PatientId::new(id).unwrap()
    }

    fn gate(store: Arc<MemoryStore>, config: ConsentConfig) -> ConsentGate {
        ConsentGate::new(store, config)
    }

    async fn grant_at(store: &MemoryStore, id: &str, grant: ConsentGrant, at: DateTime<Utc>) {
        let record = ConsentRecord::issue(patient(id), ConsentType::DataSync, grant, at);
        store.append_consent(&record).await.unwrap();
    }

    struct FailingStore;

    #[async_trait]
    impl ConsentStore for FailingStore {
        async fn append_consent(&self, _record: &ConsentRecord) -> Result<()> {
            Err(SyncError::Persistence("down".to_string()))
        }

        async fn latest_consent(
            &self,
            _patient_id: &PatientId,
            _consent_type: ConsentType,
        ) -> Result<Option<ConsentRecord>> {
            Err(SyncError::Persistence("down".to_string()))
        }
    }

    #[tokio::test]
    async fn test_missing_consent_denied_by_default() {
        let gate = gate(Arc::new(MemoryStore::new()), ConsentConfig::default());
        assert!(!gate.verify(&patient("P-1"), ConsentType::DataSync).await);
    }

    #[tokio::test]
    async fn test_missing_consent_allowed_when_configured() {
        let config = ConsentConfig {
            missing_consent: MissingConsentPolicy::Allow,
            ..ConsentConfig::default()
        };
        let gate = gate(Arc::new(MemoryStore::new()), config);
        assert!(gate.verify(&patient("P-1"), ConsentType::DataSync).await);
    }

    #[tokio::test]
    async fn test_expired_consent_denied_and_open_ended_consent_allowed() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        grant_at(
            &store,
            "P-expired",
            ConsentGrant::new("clerk").with_expiry(now - Duration::days(1)),
            now - Duration::days(10),
        )
        .await;
        grant_at(&store, "P-open", ConsentGrant::new("clerk"), now - Duration::days(10)).await;

        let config = ConsentConfig {
            max_age_days: 0,
            ..ConsentConfig::default()
        };
        let gate = gate(store, config);

        assert!(!gate.verify_at(&patient("P-expired"), ConsentType::DataSync, now).await);
        assert!(
            gate.verify_at(
                &patient("P-open"),
                ConsentType::DataSync,
                now + Duration::days(365 * 20)
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_consent_older_than_max_age_counts_as_missing() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        grant_at(&store, "P-1", ConsentGrant::new("clerk"), now - Duration::days(400)).await;

        let yearly = ConsentConfig {
            max_age_days: 365,
            ..ConsentConfig::default()
        };
        let deny = gate(store.clone(), yearly.clone());
        assert!(!deny.verify_at(&patient("P-1"), ConsentType::DataSync, now).await);

        let allow = gate(
            store,
            ConsentConfig {
                missing_consent: MissingConsentPolicy::Allow,
                ..yearly
            },
        );
        assert!(allow.verify_at(&patient("P-1"), ConsentType::DataSync, now).await);
    }

    #[tokio::test]
    async fn test_default_config_keeps_open_ended_grant_valid() {
        let store = Arc::new(MemoryStore::new());
        let now = Utc::now();
        grant_at(&store, "P-1", ConsentGrant::new("clerk"), now - Duration::days(400)).await;

        let gate = gate(store, ConsentConfig::default());
        assert!(gate.verify_at(&patient("P-1"), ConsentType::DataSync, now).await);
    }

    #[tokio::test]
    async fn test_other_consent_type_does_not_count() {
        let store = Arc::new(MemoryStore::new());
        let record = ConsentRecord::issue(
            patient("P-1"),
            ConsentType::Analytics,
            ConsentGrant::new("clerk"),
            Utc::now(),
        );
        store.append_consent(&record).await.unwrap();

        let gate = gate(store, ConsentConfig::default());
        assert!(!gate.verify(&patient("P-1"), ConsentType::DataSync).await);
        assert!(gate.verify(&patient("P-1"), ConsentType::Analytics).await);
    }

    #[tokio::test]
    async fn test_store_error_denies() {
        let config = ConsentConfig {
            missing_consent: MissingConsentPolicy::Allow,
            ..ConsentConfig::default()
        };
        let gate = ConsentGate::new(Arc::new(FailingStore), config);
        assert!(!gate.verify(&patient("P-1"), ConsentType::DataSync).await);
    }

    #[tokio::test]
    async fn test_log_returns_receipt_and_appends() {
        let store = Arc::new(MemoryStore::new());
        let gate = gate(store.clone(), ConsentConfig::default());

        let receipt = gate
            .log(&patient("P-1"), ConsentType::DataSync, ConsentGrant::new("nurse.amina"))
            .await
            .unwrap();

        assert_eq!(receipt.len(), 64);
        let consents = store.consents().await;
        assert_eq!(consents.len(), 1);
        assert_eq!(consents[0].receipt, receipt);
        assert!(gate.verify(&patient("P-1"), ConsentType::DataSync).await);
    }

    #[tokio::test]
    async fn test_log_requires_granter() {
        let gate = gate(Arc::new(MemoryStore::new()), ConsentConfig::default());
        let result = gate
            .log(&patient("P-1"), ConsentType::DataSync, ConsentGrant::new("  "))
            .await;
        assert!(matches!(result, Err(SyncError::Validation(_))));
    }

    #[tokio::test]
    async fn test_screen_skips_denied_patients() {
        let store = Arc::new(MemoryStore::new());
        grant_at(&store, "P-1", ConsentGrant::new("clerk"), Utc::now()).await;

        let gate = gate(store, ConsentConfig::default());
        let screening = gate.screen(&[patient("P-1"), patient("P-2")]).await.unwrap();

        assert_eq!(screening.allowed, vec![patient("P-1")]);
        assert_eq!(screening.denied, vec![patient("P-2")]);
    }

    #[tokio::test]
    async fn test_screen_aborts_when_configured() {
        let store = Arc::new(MemoryStore::new());
        grant_at(&store, "P-1", ConsentGrant::new("clerk"), Utc::now()).await;

        let config = ConsentConfig {
            denial_scope: DenialScope::AbortRequest,
            ..ConsentConfig::default()
        };
        let gate = gate(store, config);
        let err = gate
            .screen(&[patient("P-1"), patient("P-2")])
            .await
            .unwrap_err();

        match err {
            SyncError::ConsentDenied { patient_id, .. } => assert_eq!(patient_id, "P-2"),
            other => panic!("expected ConsentDenied, got {other:?}"),
        }
    }
}
