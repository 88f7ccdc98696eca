//! Consent records and receipts
//!
//! A consent record is appended once and never mutated. Its receipt is a
//! SHA-256 digest over the patient id, consent type, granting actor and the
//! grant timestamp, giving compliance reviewers a stable handle on the event.

use super::ids::PatientId;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Purpose a patient consents to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsentType {
    #[default]
    DataSync,
    Analytics,
    Sharing,
}

impl ConsentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsentType::DataSync => "data_sync",
            ConsentType::Analytics => "analytics",
            ConsentType::Sharing => "sharing",
        }
    }

    /// Audit-log action name under which grants of this type are recorded
    pub fn audit_action(&self) -> String {
        format!("patient_consent_{}", self.as_str())
    }
}

impl fmt::Display for ConsentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "data_sync" => Ok(ConsentType::DataSync),
            "analytics" => Ok(ConsentType::Analytics),
            "sharing" => Ok(ConsentType::Sharing),
            other => Err(format!(
                "Invalid consent type '{other}'. Must be one of: data_sync, analytics, sharing"
            )),
        }
    }
}

/// Caller-supplied metadata for a consent grant
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentGrant {
    /// Actor (clinician, registration clerk) who captured the consent
    pub granted_by: String,

    /// Consent lapses at this instant; `None` means it never expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,

    /// Hash of the biometric capture that accompanied the grant, if any
    #[serde(default)]
    pub fingerprint_hash: Option<String>,
}

impl ConsentGrant {
    pub fn new(granted_by: impl Into<String>) -> Self {
        Self {
            granted_by: granted_by.into(),
            ..Self::default()
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn with_fingerprint_hash(mut self, hash: impl Into<String>) -> Self {
        self.fingerprint_hash = Some(hash.into());
        self
    }
}

/// Append-only consent audit entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRecord {
    pub patient_id: PatientId,
    pub consent_type: ConsentType,
    pub granted_by: String,
    pub granted_at: DateTime<Utc>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fingerprint_hash: Option<String>,
    pub receipt: String,
}

impl ConsentRecord {
    /// Builds the record for a new grant and computes its receipt
    pub fn issue(
        patient_id: PatientId,
        consent_type: ConsentType,
        grant: ConsentGrant,
        granted_at: DateTime<Utc>,
    ) -> Self {
        let receipt = compute_receipt(&patient_id, consent_type, &grant.granted_by, granted_at);
        Self {
            patient_id,
            consent_type,
            granted_by: grant.granted_by,
            granted_at,
            expires_at: grant.expires_at,
            fingerprint_hash: grant.fingerprint_hash,
            receipt,
        }
    }

    /// True when the grant has no expiry or expires after `now`
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |expires_at| expires_at > now)
    }
}

/// SHA-256 hex digest of patient id, consent type, granter and timestamp
pub fn compute_receipt(
    patient_id: &PatientId,
    consent_type: ConsentType,
    granted_by: &str,
    granted_at: DateTime<Utc>,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(patient_id.as_str().as_bytes());
    hasher.update(consent_type.as_str().as_bytes());
    hasher.update(granted_by.as_bytes());
    hasher.update(
        granted_at
            .to_rfc3339_opts(SecondsFormat::Micros, true)
            .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}
