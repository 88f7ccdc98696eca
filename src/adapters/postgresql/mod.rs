//! PostgreSQL storage backend
//!
//! This module provides the production target store: pooled connections,
//! one transaction per record batch, and consent receipts in `audit_logs`.

pub mod adapter;
pub mod client;
pub mod models;

pub use adapter::PostgreSQLAdapter;
pub use client::PostgreSQLClient;
pub use models::{ConsentAuditRow, ConsentDetails};
