//! Integration tests for configuration loading and validation
//!
//! Note: Tests that modify environment variables should be run with --test-threads=1
//! to avoid interference between tests.

use hms_sync::config::{load_config, DatabaseTarget, DenialScope, Environment, MissingConsentPolicy};
use hms_sync::domain::{ConsentType, SyncError};
use secrecy::ExposeSecret;
use std::io::Write;
use std::sync::Mutex;
use tempfile::NamedTempFile;

// Mutex to serialize tests that modify environment variables
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Helper function to clean up environment variables
fn cleanup_env_vars() {
    std::env::remove_var("HMS_SYNC_APPLICATION_LOG_LEVEL");
    std::env::remove_var("HMS_SYNC_HMS_MAX_CONCURRENCY");
    std::env::remove_var("HMS_SYNC_CONSENT_DENIAL_SCOPE");
    std::env::remove_var("HMS_SYNC_POSTGRESQL_CONNECTION_STRING");
    std::env::remove_var("TEST_HMS_PASSWORD");
    std::env::remove_var("TEST_DATABASE_URL");
}

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_complete_config() {
    let _guard = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("TEST_HMS_PASSWORD", "openmrs-secret");
    std::env::set_var("TEST_DATABASE_URL", "postgresql://sync:pw@db.internal:5432/clinic");

    let file = write_config(
        r#"
environment = "staging"
database_target = "postgresql"

[application]
log_level = "debug"

[hms]
timeout_seconds = 20
request_timeout_seconds = 120
max_concurrency = 8

[hms.retry]
max_retries = 2
initial_delay_ms = 250

[hms.credentials]
system_type = "OpenMRS"
base_url = "https://openmrs.example.org/openmrs/"
username = "sync_user"
password = "${TEST_HMS_PASSWORD}"

[consent]
consent_type = "sharing"
missing_consent = "allow"
denial_scope = "abort_request"
max_age_days = 180

[postgresql]
connection_string = "${TEST_DATABASE_URL}"
max_connections = 5
ssl_mode = "require"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.environment, Environment::Staging);
    assert_eq!(config.database_target, DatabaseTarget::PostgreSQL);
    assert_eq!(config.application.log_level, "debug");
    assert_eq!(config.hms.max_concurrency, 8);
    assert_eq!(config.hms.retry.max_retries, 2);

    let credentials = config.hms.credentials.as_ref().unwrap();
    assert_eq!(credentials.normalized_base_url(), "https://openmrs.example.org/openmrs");
    assert_eq!(
        credentials.password.as_ref().unwrap().expose_secret().as_str(),
        "openmrs-secret"
    );

    assert_eq!(config.consent.consent_type, ConsentType::Sharing);
    assert_eq!(config.consent.missing_consent, MissingConsentPolicy::Allow);
    assert_eq!(config.consent.denial_scope, DenialScope::AbortRequest);
    assert_eq!(config.consent.max_age_days, 180);

    let pg = config.postgresql.as_ref().unwrap();
    assert_eq!(pg.max_connections, 5);
    assert_eq!(pg.ssl_mode, "require");

    cleanup_env_vars();
}

#[test]
fn test_defaults_for_minimal_config() {
    let _guard = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config("database_target = \"memory\"\n");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.environment, Environment::Development);
    assert_eq!(config.consent.consent_type, ConsentType::DataSync);
    assert_eq!(config.consent.missing_consent, MissingConsentPolicy::Deny);
    assert_eq!(config.consent.denial_scope, DenialScope::SkipPatient);
    assert_eq!(config.consent.max_age_days, 0);
    assert!(config.hms.tls_verify);
    assert!(config.hms.credentials.is_none());
}

#[test]
fn test_env_overrides_apply_after_file() {
    let _guard = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();
    std::env::set_var("HMS_SYNC_APPLICATION_LOG_LEVEL", "warn");
    std::env::set_var("HMS_SYNC_HMS_MAX_CONCURRENCY", "2");
    std::env::set_var("HMS_SYNC_CONSENT_DENIAL_SCOPE", "abort_request");

    let file = write_config("database_target = \"memory\"\n[hms]\nmax_concurrency = 16\n");
    let config = load_config(file.path()).unwrap();

    assert_eq!(config.application.log_level, "warn");
    assert_eq!(config.hms.max_concurrency, 2);
    assert_eq!(config.consent.denial_scope, DenialScope::AbortRequest);

    cleanup_env_vars();
}

#[test]
fn test_missing_env_var_is_reported() {
    let _guard = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let file = write_config(
        r#"
database_target = "postgresql"

[postgresql]
connection_string = "${TEST_DATABASE_URL}"
"#,
    );

    match load_config(file.path()) {
        Err(SyncError::Configuration(message)) => assert!(message.contains("TEST_DATABASE_URL")),
        other => panic!("expected configuration error, got {other:?}"),
    }
}

#[test]
fn test_production_rejects_insecure_settings() {
    let _guard = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    let insecure_tls = write_config(
        "environment = \"production\"\ndatabase_target = \"memory\"\n[hms]\ntls_verify = false\n",
    );
    assert!(load_config(insecure_tls.path()).is_err());

    let memory_target =
        write_config("environment = \"production\"\ndatabase_target = \"memory\"\n");
    assert!(load_config(memory_target.path()).is_err());
}

#[test]
fn test_invalid_values_rejected() {
    let _guard = ENV_MUTEX.lock().unwrap();
    cleanup_env_vars();

    for contents in [
        "database_target = \"memory\"\n[hms]\nmax_concurrency = 0\n",
        "database_target = \"memory\"\n[consent]\nmissing_consent = \"maybe\"\n",
        "database_target = \"memory\"\n[consent]\nconsent_type = \"marketing\"\n",
        "database_target = \"memory\"\n[hms.credentials]\nsystem_type = \"openmrs\"\nbase_url = \"ftp://openmrs\"\n",
        "database_target = \"postgresql\"\n",
    ] {
        let file = write_config(contents);
        assert!(
            matches!(load_config(file.path()), Err(SyncError::Configuration(_))),
            "expected rejection for:\n{contents}"
        );
    }
}
