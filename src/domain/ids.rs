//! Domain identifier types with validation
//!
//! Newtype wrappers keep the external (HMS-facing) patient identifier apart
//! from the internal surrogate key of the target store.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// External patient identifier
///
/// The identifier shared between the HMS and the `patients.patient_id`
/// column of the target store. Surrounding whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use hms_sync::domain::ids::PatientId;
/// use std::str::FromStr;
///
/// let patient_id = PatientId::from_str(" ERL-2024-0042 ").unwrap();
/// assert_eq!(patient_id.as_str(), "ERL-2024-0042");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PatientId(String);

impl PatientId {
    /// Creates a new PatientId, rejecting empty identifiers
    pub fn new(id: impl Into<String>) -> Result<Self, String> {
        let id = id.into();
        let trimmed = id.trim();
        if trimmed.is_empty() {
            return Err("Patient ID cannot be empty".to_string());
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Returns the patient ID as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes self and returns the inner String
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for PatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PatientId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for PatientId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PatientId> for String {
    fn from(id: PatientId) -> Self {
        id.0
    }
}

impl AsRef<str> for PatientId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Surrogate key of a row in the `patients` table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InternalPatientId(i64);

impl InternalPatientId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for InternalPatientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a list of raw identifiers, failing on the first empty entry
pub fn parse_patient_ids<I, S>(raw: I) -> Result<Vec<PatientId>, String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    raw.into_iter().map(PatientId::new).collect()
}
