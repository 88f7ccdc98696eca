//! Storage factory
//!
//! This module creates the clinical and consent stores from configuration.
//! Both are backed by the same underlying client so they share one pool.

use crate::adapters::database::traits::{ClinicalStore, ConsentStore};
use crate::adapters::memory::MemoryStore;
use crate::adapters::postgresql::adapter::PostgreSQLAdapter;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::{DatabaseTarget, SyncConfig};
use crate::domain::{Result, SyncError};
use std::sync::Arc;

/// Clinical and consent stores backed by the same target
#[derive(Clone)]
pub struct Stores {
    pub clinical: Arc<dyn ClinicalStore>,
    pub consent: Arc<dyn ConsentStore>,
}

impl Stores {
    /// Wraps one value implementing both traits
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: ClinicalStore + ConsentStore + 'static,
    {
        Self {
            clinical: store.clone(),
            consent: store,
        }
    }
}

/// Create the stores selected by `database_target`
///
/// When `postgresql.apply_migrations` is set, the bundled schema is applied
/// before the stores are returned.
///
/// # Errors
///
/// Returns a configuration error if the selected backend has no settings, or
/// a persistence error if the schema cannot be applied.
pub async fn create_stores(config: &SyncConfig) -> Result<Stores> {
    match config.database_target {
        DatabaseTarget::PostgreSQL => {
            let pg_config = config.postgresql.as_ref().ok_or_else(|| {
                SyncError::Configuration(
                    "database_target is postgresql but [postgresql] is missing".to_string(),
                )
            })?;

            tracing::info!("Creating PostgreSQL stores");
            let client = Arc::new(PostgreSQLClient::new(pg_config)?);
            let adapter = Arc::new(PostgreSQLAdapter::new_with_arc(client));

            if pg_config.apply_migrations {
                adapter.ensure_schema().await?;
            }

            Ok(Stores::shared(adapter))
        }
        DatabaseTarget::Memory => {
            tracing::warn!("Using the in-memory store; synchronized data will not persist");
            Ok(Stores::shared(Arc::new(MemoryStore::new())))
        }
    }
}
