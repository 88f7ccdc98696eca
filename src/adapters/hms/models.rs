//! Shared fetch models and wire-value helpers
//!
//! Every HMS variant returns its records wrapped in [`Fetched`], which keeps
//! the count of records that could not be mapped so the orchestrator can
//! report stored versus attempted.

use crate::domain::{parse_timestamp, ClinicalRecord, DateRange, PatientId, Result, SyncError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Records fetched for one data type, plus what was dropped on the way
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// Successfully mapped records inside the requested window
    pub records: Vec<T>,

    /// Records skipped because their payload could not be mapped
    pub malformed: usize,

    /// Records dropped because they fell outside the date window
    pub out_of_range: usize,

    /// Patients whose fetch failed while others succeeded
    pub failed_patients: Vec<PatientFailure>,
}

/// A patient whose records could not be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientFailure {
    pub patient_id: PatientId,

    /// Error category, see [`SyncError::kind`]
    pub kind: &'static str,

    pub message: String,
}

impl PatientFailure {
    pub fn new(patient_id: PatientId, error: &SyncError) -> Self {
        Self {
            patient_id,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl<T> Default for Fetched<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            malformed: 0,
            out_of_range: 0,
            failed_patients: Vec::new(),
        }
    }
}

impl<T: ClinicalRecord> Fetched<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts one mapping outcome
    ///
    /// Mapping failures are logged and counted; they never abort the fetch.
    pub fn accept(&mut self, mapped: Result<T>, range: &DateRange, source: &str) {
        match mapped {
            Ok(record) if range.contains(&record.effective_at()) => self.records.push(record),
            Ok(record) => {
                tracing::debug!(
                    data_type = %T::DATA_TYPE,
                    patient_id = %record.patient_id(),
                    effective_at = %record.effective_at(),
                    "Dropping record outside requested date range"
                );
                self.out_of_range += 1;
            }
            Err(e) => {
                tracing::warn!(
                    data_type = %T::DATA_TYPE,
                    source = %source,
                    error = %e,
                    "Skipping malformed record"
                );
                self.malformed += 1;
            }
        }
    }

    /// Records that were in range, whether or not they mapped
    pub fn attempted(&self) -> usize {
        self.records.len() + self.malformed
    }
}

impl<T> Fetched<T> {
    pub fn merge(&mut self, other: Fetched<T>) {
        self.records.extend(other.records);
        self.malformed += other.malformed;
        self.out_of_range += other.out_of_range;
        self.failed_patients.extend(other.failed_patients);
    }
}

/// Deserializes one wire record, turning serde failures into mapping errors
pub fn decode_record<D>(value: Value) -> Result<D>
where
    D: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value).map_err(|e| SyncError::Mapping(e.to_string()))
}

/// Parses a wire timestamp, naming the offending field on failure
pub fn wire_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>> {
    parse_timestamp(raw).map_err(|e| SyncError::Mapping(format!("{field}: {e}")))
}

/// Query parameters carrying the date window, omitting open ends
pub fn range_query(
    range: &DateRange,
    from_key: &'static str,
    to_key: &'static str,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(2);
    if let Some(from) = range.from {
        query.push((from_key, from.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    if let Some(to) = range.to {
        query.push((to_key, to.to_rfc3339_opts(SecondsFormat::Secs, true)));
    }
    query
}

/// Reads a numeric value that may arrive as a JSON number or a numeric string
pub fn lenient_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Renders a scalar or `{ "display": .. }` object as text
pub fn display_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(map) => map.get("display").and_then(display_text),
        _ => None,
    }
}
