//! Consent command implementation
//!
//! `consent log` appends a consent grant and prints its receipt;
//! `consent verify` answers whether a patient may be synchronized.

use crate::adapters::database::create_stores;
use crate::cli::{exit_code_for, exit_codes};
use crate::config::load_config;
use crate::core::consent::ConsentGate;
use crate::domain::{parse_timestamp, ConsentGrant, ConsentType, PatientId};
use clap::{Args, Subcommand};

/// Arguments for the consent command
#[derive(Args, Debug)]
pub struct ConsentArgs {
    #[command(subcommand)]
    pub action: ConsentAction,
}

#[derive(Subcommand, Debug)]
pub enum ConsentAction {
    /// Record a consent grant
    Log(LogArgs),

    /// Check whether a patient currently grants consent
    Verify(VerifyArgs),
}

#[derive(Args, Debug)]
pub struct LogArgs {
    #[arg(long)]
    pub patient_id: String,

    /// Actor who captured the consent
    #[arg(long)]
    pub granted_by: String,

    /// data_sync, analytics or sharing (defaults to the configured type)
    #[arg(long)]
    pub consent_type: Option<String>,

    /// When the consent lapses (RFC 3339 or YYYY-MM-DD)
    #[arg(long)]
    pub expires_at: Option<String>,

    /// Hash of the accompanying biometric capture
    #[arg(long)]
    pub fingerprint_hash: Option<String>,
}

#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[arg(long)]
    pub patient_id: String,

    /// data_sync, analytics or sharing (defaults to the configured type)
    #[arg(long)]
    pub consent_type: Option<String>,
}

impl ConsentArgs {
    /// Execute the consent command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("❌ Failed to load configuration: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        let stores = match create_stores(&config).await {
            Ok(s) => s,
            Err(e) => {
                eprintln!("❌ Failed to connect to the target store: {e}");
                return Ok(exit_code_for(&e));
            }
        };
        let gate = ConsentGate::new(stores.consent, config.consent.clone());

        match &self.action {
            ConsentAction::Log(args) => args.execute(&gate).await,
            ConsentAction::Verify(args) => args.execute(&gate).await,
        }
    }
}

fn resolve_consent_type(raw: Option<&str>, gate: &ConsentGate) -> Result<ConsentType, String> {
    raw.map_or(Ok(gate.config().consent_type), |raw| raw.parse())
}

impl LogArgs {
    fn parse(&self, gate: &ConsentGate) -> Result<(PatientId, ConsentType, ConsentGrant), String> {
        let patient_id = PatientId::new(self.patient_id.as_str())?;
        let consent_type = resolve_consent_type(self.consent_type.as_deref(), gate)?;
        let mut grant = ConsentGrant::new(self.granted_by.as_str());
        if let Some(ref raw) = self.expires_at {
            grant = grant.with_expiry(parse_timestamp(raw)?);
        }
        if let Some(ref hash) = self.fingerprint_hash {
            grant = grant.with_fingerprint_hash(hash.as_str());
        }
        Ok((patient_id, consent_type, grant))
    }

    async fn execute(&self, gate: &ConsentGate) -> anyhow::Result<i32> {
        let (patient_id, consent_type, grant) = match self.parse(gate) {
            Ok(p) => p,
            Err(e) => {
                eprintln!("❌ Invalid arguments: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        match gate.log(&patient_id, consent_type, grant).await {
            Ok(receipt) => {
                println!("✅ Consent logged for {patient_id} ({consent_type})");
                println!("   Receipt: {receipt}");
                Ok(exit_codes::SUCCESS)
            }
            Err(e) => {
                eprintln!("❌ Failed to log consent: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}

impl VerifyArgs {
    async fn execute(&self, gate: &ConsentGate) -> anyhow::Result<i32> {
        let parsed = PatientId::new(self.patient_id.as_str()).and_then(|patient_id| {
            resolve_consent_type(self.consent_type.as_deref(), gate)
                .map(|consent_type| (patient_id, consent_type))
        });

        let (patient_id, consent_type) = match parsed {
            Ok(p) => p,
            Err(e) => {
                eprintln!("❌ Invalid arguments: {e}");
                return Ok(exit_codes::CONFIGURATION);
            }
        };

        if gate.verify(&patient_id, consent_type).await {
            println!("✅ {patient_id} grants {consent_type} consent");
            Ok(exit_codes::SUCCESS)
        } else {
            println!("❌ {patient_id} does not grant {consent_type} consent");
            Ok(exit_codes::PARTIAL)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryStore;
    use crate::config::ConsentConfig;
    use std::sync::Arc;

    fn gate(store: Arc<MemoryStore>) -> ConsentGate {
        ConsentGate::new(store, ConsentConfig::default())
    }

    #[tokio::test]
    async fn test_log_then_verify() {
        let gate = gate(Arc::new(MemoryStore::new()));

        let verify = VerifyArgs {
            patient_id: "P-1".to_string(),
            consent_type: None,
        };
        assert_eq!(verify.execute(&gate).await.unwrap(), 1);

        let log = LogArgs {
            patient_id: "P-1".to_string(),
            granted_by: "nurse.amina".to_string(),
            consent_type: Some("data_sync".to_string()),
            expires_at: None,
            fingerprint_hash: Some("f00d".to_string()),
        };
        assert_eq!(log.execute(&gate).await.unwrap(), 0);
        assert_eq!(verify.execute(&gate).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_log_rejects_bad_expiry() {
        let gate = gate(Arc::new(MemoryStore::new()));
        let log = LogArgs {
            patient_id: "P-1".to_string(),
            granted_by: "nurse.amina".to_string(),
            consent_type: None,
            expires_at: Some("next week".to_string()),
            fingerprint_hash: None,
        };
        assert_eq!(log.execute(&gate).await.unwrap(), 2);
    }
}
