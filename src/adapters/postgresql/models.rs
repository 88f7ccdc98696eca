//! PostgreSQL row models
//!
//! Consent receipts are kept in the generic `audit_logs` table; these types
//! convert between [`ConsentRecord`] and its row form.

use crate::domain::{ConsentRecord, ConsentType, PatientId, Result, SyncError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON stored in `audit_logs.details` for a consent grant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsentDetails {
    pub consent_type: ConsentType,
    pub granted_by: String,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fingerprint_hash: Option<String>,
}

/// One `audit_logs` row describing a consent grant
#[derive(Debug, Clone, PartialEq)]
pub struct ConsentAuditRow {
    pub action: String,
    pub patient_id: String,
    pub details: Value,
    pub receipt: String,
    pub created_at: DateTime<Utc>,
}

impl ConsentAuditRow {
    pub fn from_record(record: &ConsentRecord) -> Result<Self> {
        let details = ConsentDetails {
            consent_type: record.consent_type,
            granted_by: record.granted_by.clone(),
            expires_at: record.expires_at,
            fingerprint_hash: record.fingerprint_hash.clone(),
        };

        Ok(Self {
            action: record.consent_type.audit_action(),
            patient_id: record.patient_id.to_string(),
            details: serde_json::to_value(details)
                .map_err(|e| SyncError::Serialization(e.to_string()))?,
            receipt: record.receipt.clone(),
            created_at: record.granted_at,
        })
    }

    pub fn into_record(self) -> Result<ConsentRecord> {
        let details: ConsentDetails = serde_json::from_value(self.details).map_err(|e| {
            SyncError::Serialization(format!("Corrupt consent audit entry {}: {e}", self.receipt))
        })?;
        let patient_id = PatientId::new(self.patient_id).map_err(SyncError::Validation)?;

        Ok(ConsentRecord {
            patient_id,
            consent_type: details.consent_type,
            granted_by: details.granted_by,
            granted_at: self.created_at,
            expires_at: details.expires_at,
            fingerprint_hash: details.fingerprint_hash,
            receipt: self.receipt,
        })
    }
}
