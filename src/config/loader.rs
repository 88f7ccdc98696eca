//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{DatabaseTarget, SyncConfig};
use super::secret::secret_string;
use crate::domain::errors::SyncError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`SyncConfig`]
/// 4. Applies environment variable overrides (`HMS_SYNC_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`SyncError::Configuration`] if the file is missing or unreadable,
/// a referenced environment variable is unset, parsing fails, or validation
/// rejects a value.
///
/// # Examples
///
/// ```no_run
/// use hms_sync::config::load_config;
///
/// let config = load_config("hms-sync.toml").expect("Failed to load config");
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<SyncConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(SyncError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        SyncError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    let mut config = parse_config(&contents)?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        SyncError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Parses configuration text after `${VAR}` substitution, without validating
pub fn parse_config(contents: &str) -> Result<SyncConfig> {
    let contents = substitute_env_vars(contents)?;
    toml::from_str(&contents)
        .map_err(|e| SyncError::Configuration(format!("Failed to parse TOML: {e}")))
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Comment lines are copied untouched so documented placeholders do not
/// have to be set.
fn substitute_env_vars(input: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| SyncError::Configuration(format!("Invalid substitution pattern: {e}")))?;
    let mut lines = Vec::new();
    let mut missing_vars: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_string());
            continue;
        }

        let mut processed_line = line.to_string();
        for cap in re.captures_iter(line) {
            let var_name = &cap[1];
            match std::env::var(var_name) {
                Ok(value) => {
                    let placeholder = format!("${{{var_name}}}");
                    processed_line = processed_line.replace(&placeholder, &value);
                }
                Err(_) => {
                    if !missing_vars.iter().any(|v| v == var_name) {
                        missing_vars.push(var_name.to_string());
                    }
                }
            }
        }
        lines.push(processed_line);
    }

    if !missing_vars.is_empty() {
        return Err(SyncError::Configuration(format!(
            "Missing required environment variables: {}",
            missing_vars.join(", ")
        )));
    }

    Ok(lines.join("\n"))
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(val) => val.trim().parse().map(Some).map_err(|_| {
            SyncError::Configuration(format!("Invalid value '{val}' for {name}"))
        }),
        Err(_) => Ok(None),
    }
}

/// Applies environment variable overrides using the `HMS_SYNC_*` prefix
///
/// Variables follow the pattern `HMS_SYNC_<SECTION>_<KEY>`, for example
/// `HMS_SYNC_HMS_MAX_CONCURRENCY` or `HMS_SYNC_POSTGRESQL_CONNECTION_STRING`.
fn apply_env_overrides(config: &mut SyncConfig) -> Result<()> {
    // Application overrides
    if let Ok(val) = std::env::var("HMS_SYNC_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }

    // HMS transport overrides
    if let Some(val) = parse_env("HMS_SYNC_HMS_TIMEOUT_SECONDS")? {
        config.hms.timeout_seconds = val;
    }
    if let Some(val) = parse_env("HMS_SYNC_HMS_REQUEST_TIMEOUT_SECONDS")? {
        config.hms.request_timeout_seconds = val;
    }
    if let Some(val) = parse_env("HMS_SYNC_HMS_MAX_CONCURRENCY")? {
        config.hms.max_concurrency = val;
    }
    if let Some(val) = parse_env("HMS_SYNC_HMS_TLS_VERIFY")? {
        config.hms.tls_verify = val;
    }
    if let Some(val) = parse_env("HMS_SYNC_HMS_RETRY_MAX_RETRIES")? {
        config.hms.retry.max_retries = val;
    }

    // Credential overrides (only if credentials are configured)
    if let Some(ref mut credentials) = config.hms.credentials {
        if let Ok(val) = std::env::var("HMS_SYNC_HMS_CREDENTIALS_BASE_URL") {
            credentials.base_url = val;
        }
        if let Ok(val) = std::env::var("HMS_SYNC_HMS_CREDENTIALS_USERNAME") {
            credentials.username = Some(val);
        }
        if let Ok(val) = std::env::var("HMS_SYNC_HMS_CREDENTIALS_PASSWORD") {
            credentials.password = Some(secret_string(val));
        }
        if let Ok(val) = std::env::var("HMS_SYNC_HMS_CREDENTIALS_CLIENT_SECRET") {
            credentials.client_secret = Some(secret_string(val));
        }
    }

    // Consent overrides
    if let Ok(val) = std::env::var("HMS_SYNC_CONSENT_MISSING_CONSENT") {
        config.consent.missing_consent = toml::Value::String(val.clone())
            .try_into()
            .map_err(|_| {
                SyncError::Configuration(format!(
                    "Invalid value '{val}' for HMS_SYNC_CONSENT_MISSING_CONSENT"
                ))
            })?;
    }
    if let Ok(val) = std::env::var("HMS_SYNC_CONSENT_DENIAL_SCOPE") {
        config.consent.denial_scope = toml::Value::String(val.clone())
            .try_into()
            .map_err(|_| {
                SyncError::Configuration(format!(
                    "Invalid value '{val}' for HMS_SYNC_CONSENT_DENIAL_SCOPE"
                ))
            })?;
    }

    // PostgreSQL overrides (only if PostgreSQL is the active target)
    if config.database_target == DatabaseTarget::PostgreSQL {
        if let Some(ref mut pg_config) = config.postgresql {
            if let Ok(val) = std::env::var("HMS_SYNC_POSTGRESQL_CONNECTION_STRING") {
                pg_config.connection_string = secret_string(val);
            }
            if let Some(val) = parse_env("HMS_SYNC_POSTGRESQL_MAX_CONNECTIONS")? {
                pg_config.max_connections = val;
            }
        }
    }

    // Logging overrides
    if let Some(val) = parse_env("HMS_SYNC_LOGGING_LOCAL_ENABLED")? {
        config.logging.local_enabled = val;
    }
    if let Ok(val) = std::env::var("HMS_SYNC_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
