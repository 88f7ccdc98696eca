//! PostgreSQL client implementation
//!
//! Owns the connection pool. TLS follows `postgresql.ssl_mode`; the statement
//! timeout is applied as a session option so every pooled connection gets it.

use crate::config::PostgreSQLConfig;
use crate::domain::{Result, SyncError};
use deadpool_postgres::{Manager, ManagerConfig, Object, Pool, RecyclingMethod};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::NoTls;

/// PostgreSQL client for the sync engine
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Masked connection string for logs
    safe_connection_string: String,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string or TLS setup is
    /// invalid, or the pool cannot be built.
    pub fn new(config: &PostgreSQLConfig) -> Result<Self> {
        let raw = config.connection_string.expose_secret();
        let mut pg_config: tokio_postgres::Config = raw.as_str().parse().map_err(|e| {
            SyncError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
        })?;

        pg_config.options(&format!(
            "-c statement_timeout={}",
            config.statement_timeout_seconds * 1000
        ));
        pg_config.ssl_mode(match config.ssl_mode.as_str() {
            "disable" => SslMode::Disable,
            "prefer" => SslMode::Prefer,
            _ => SslMode::Require,
        });

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = if config.ssl_mode == "disable" {
            Manager::from_config(pg_config, NoTls, manager_config)
        } else {
            Manager::from_config(pg_config, tls_connector(&config.ssl_mode)?, manager_config)
        };

        let timeout = Some(Duration::from_secs(config.connection_timeout_seconds));
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(timeout)
            .create_timeout(timeout)
            .recycle_timeout(timeout)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .map_err(|e| {
                SyncError::Configuration(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            safe_connection_string: mask_connection_string(raw.as_str()),
        })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| SyncError::Persistence(format!("Connection test failed: {e}")))?;

        tracing::info!(
            database = %self.safe_connection_string,
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Apply the bundled schema
    ///
    /// The migration only creates objects that are missing, so running it on
    /// every start is safe.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;

        let migration_sql = include_str!("../../../migrations/001_initial_schema.sql");

        client
            .batch_execute(migration_sql)
            .await
            .map_err(|e| SyncError::Persistence(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema initialized successfully");
        Ok(())
    }

    /// Get a connection from the pool
    pub async fn get_connection(&self) -> Result<Object> {
        self.pool.get().await.map_err(|e| {
            SyncError::Persistence(format!("Failed to get connection from pool: {e}"))
        })
    }

    /// Connection string with credentials removed
    pub fn connection_string_safe(&self) -> &str {
        &self.safe_connection_string
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

fn tls_connector(ssl_mode: &str) -> Result<postgres_native_tls::MakeTlsConnector> {
    let mut builder = native_tls::TlsConnector::builder();
    match ssl_mode {
        "prefer" | "require" => {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        "verify-ca" => {
            builder.danger_accept_invalid_hostnames(true);
        }
        _ => {}
    }

    let connector = builder
        .build()
        .map_err(|e| SyncError::Configuration(format!("Failed to initialize TLS: {e}")))?;
    Ok(postgres_native_tls::MakeTlsConnector::new(connector))
}

/// Removes user and password from a connection string
pub fn mask_connection_string(raw: &str) -> String {
    let without_scheme = raw
        .strip_prefix("postgresql://")
        .or_else(|| raw.strip_prefix("postgres://"))
        .unwrap_or(raw);

    match without_scheme.rsplit_once('@') {
        Some((_, host_part)) => format!("postgresql://***@{host_part}"),
        None => format!("postgresql://{without_scheme}"),
    }
}
