//! File ingestion
//!
//! Reads a JSON array of canonical records of one type and stores it through
//! the [`PersistenceMapper`]. Entries that do not deserialize are counted and
//! skipped; the rest of the file is still stored.

use crate::core::persistence::{PersistenceMapper, RecordBatch, StoreReport};
use crate::domain::{DataType, Result, SyncError};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::path::Path;

/// Outcome of one file import
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub data_type: DataType,

    /// Entries found in the file
    pub total: usize,

    pub malformed: usize,

    pub store: StoreReport,
}

/// Parse file contents into a batch of `data_type` records
///
/// Returns the batch and the number of malformed entries.
pub fn parse_records(contents: &str, data_type: DataType) -> Result<(RecordBatch, usize)> {
    let entries: Vec<Value> = serde_json::from_str(contents).map_err(|e| {
        SyncError::Validation(format!("import file must be a JSON array of records: {e}"))
    })?;

    let batch = match data_type {
        DataType::Vitals => decode_all(entries).map(RecordBatch::Vitals),
        DataType::LabResults => decode_all(entries).map(RecordBatch::LabResults),
        DataType::Prescriptions => decode_all(entries).map(RecordBatch::Prescriptions),
        DataType::Diagnoses => decode_all(entries).map(RecordBatch::Diagnoses),
    };

    Ok((batch.records, batch.malformed))
}

struct Decoded<B> {
    records: B,
    malformed: usize,
}

impl<T> Decoded<Vec<T>> {
    fn map<B>(self, f: impl FnOnce(Vec<T>) -> B) -> Decoded<B> {
        Decoded {
            records: f(self.records),
            malformed: self.malformed,
        }
    }
}

fn decode_all<T: DeserializeOwned>(entries: Vec<Value>) -> Decoded<Vec<T>> {
    let mut records = Vec::with_capacity(entries.len());
    let mut malformed = 0;

    for (index, entry) in entries.into_iter().enumerate() {
        match serde_json::from_value::<T>(entry) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed import entry");
                malformed += 1;
            }
        }
    }

    Decoded { records, malformed }
}

/// Import one file of `data_type` records
pub async fn ingest_file(
    mapper: &PersistenceMapper,
    path: impl AsRef<Path>,
    data_type: DataType,
) -> Result<IngestReport> {
    let path = path.as_ref();
    let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
        SyncError::Io(format!("Failed to read import file {}: {e}", path.display()))
    })?;

    let (batch, malformed) = parse_records(&contents, data_type)?;
    let total = batch.len() + malformed;

    tracing::info!(
        path = %path.display(),
        data_type = %data_type,
        total,
        malformed,
        "Importing records"
    );

    let store = mapper.store(batch).await?;

    Ok(IngestReport {
        data_type,
        total,
        malformed,
        store,
    })
}
