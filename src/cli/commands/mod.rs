//! CLI command implementations
//!
//! This module contains all CLI command implementations.

pub mod consent;
pub mod import;
pub mod init;
pub mod status;
pub mod sync;
pub mod validate;
