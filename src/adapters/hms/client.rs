//! HMS client factory
//!
//! Resolves a declared system-type string to a concrete [`HmsClient`].

use super::vendor::{AfyaProClient, CustomEmrClient, HmsClient, OpenMrsClient};
use crate::config::{HmsConfig, HmsCredentials};
use crate::domain::{Result, SyncError};
use std::fmt;
use std::str::FromStr;

/// Supported hospital management systems
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HmsSystemType {
    OpenMrs,
    AfyaPro,
    CustomEmr,
}

impl HmsSystemType {
    pub const ALL: [HmsSystemType; 3] = [
        HmsSystemType::OpenMrs,
        HmsSystemType::AfyaPro,
        HmsSystemType::CustomEmr,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HmsSystemType::OpenMrs => "openmrs",
            HmsSystemType::AfyaPro => "afyapro",
            HmsSystemType::CustomEmr => "custom",
        }
    }

    /// Authentication scheme, as shown by `status`
    pub fn auth_scheme(&self) -> &'static str {
        match self {
            HmsSystemType::OpenMrs => "session cookie",
            HmsSystemType::AfyaPro => "OAuth2 client credentials",
            HmsSystemType::CustomEmr => "username/password token",
        }
    }
}

impl fmt::Display for HmsSystemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HmsSystemType {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openmrs" => Ok(HmsSystemType::OpenMrs),
            "afyapro" => Ok(HmsSystemType::AfyaPro),
            "custom" => Ok(HmsSystemType::CustomEmr),
            _ => Err(SyncError::UnsupportedSystem(format!(
                "'{s}'. Supported systems: openmrs, afyapro, custom"
            ))),
        }
    }
}

/// Create an unauthenticated client for the declared system type
///
/// # Errors
///
/// Returns `SyncError::UnsupportedSystem` for an unknown system type, and a
/// configuration error if the credentials or HTTP client are invalid.
///
/// # Example
///
/// ```
/// use hms_sync::adapters::hms::create_hms_client;
/// use hms_sync::config::{HmsConfig, HmsCredentials};
/// use hms_sync::domain::SyncError;
///
/// let credentials = HmsCredentials::new("cerner", "https://ehr.example.org");
/// let result = create_hms_client(&credentials, &HmsConfig::default());
/// assert!(matches!(result, Err(SyncError::UnsupportedSystem(_))));
/// ```
pub fn create_hms_client(
    credentials: &HmsCredentials,
    config: &HmsConfig,
) -> Result<Box<dyn HmsClient>> {
    let system: HmsSystemType = credentials.system_type.parse()?;
    credentials
        .validate()
        .map_err(SyncError::Configuration)?;

    tracing::debug!(
        system = %system,
        base_url = %credentials.normalized_base_url(),
        "Creating HMS client"
    );

    let client: Box<dyn HmsClient> = match system {
        HmsSystemType::OpenMrs => Box::new(OpenMrsClient::new(credentials, config)?),
        HmsSystemType::AfyaPro => Box::new(AfyaProClient::new(credentials, config)?),
        HmsSystemType::CustomEmr => Box::new(CustomEmrClient::new(credentials, config)?),
    };

    Ok(client)
}
