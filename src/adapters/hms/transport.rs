//! HTTP plumbing shared by every HMS variant
//!
//! Handles client construction, status classification, bounded retry with
//! exponential backoff for transient failures, and concurrent per-patient
//! fan-out capped at `hms.max_concurrency`.

use super::models::{Fetched, PatientFailure};
use crate::config::{HmsConfig, RetryConfig};
use crate::domain::{HmsError, PatientId, Result, SyncError};
use futures::stream::{self, StreamExt};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response, StatusCode};
use serde_json::Value;
use std::future::Future;
use std::time::Duration;

/// Credential attached to every authenticated HMS request
#[derive(Clone)]
pub enum AuthHeader {
    /// OpenMRS session cookie
    SessionCookie(String),
    /// OAuth2 or login token
    Bearer(String),
}

impl AuthHeader {
    pub fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            AuthHeader::SessionCookie(session_id) => {
                request.header(reqwest::header::COOKIE, format!("JSESSIONID={session_id}"))
            }
            AuthHeader::Bearer(token) => request.bearer_auth(token),
        }
    }
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthHeader::SessionCookie(_) => f.write_str("SessionCookie([REDACTED])"),
            AuthHeader::Bearer(_) => f.write_str("Bearer([REDACTED])"),
        }
    }
}

/// Shared HTTP transport for one HMS client
#[derive(Debug, Clone)]
pub struct HmsTransport {
    client: Client,
    retry: RetryConfig,
    max_concurrency: usize,
}

impl HmsTransport {
    /// Builds the HTTP client from transport settings
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the TLS backend cannot be initialized.
    pub fn new(config: &HmsConfig) -> Result<Self> {
        let mut client_builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .user_agent(concat!("hms-sync/", env!("CARGO_PKG_VERSION")));

        if !config.tls_verify {
            tracing::warn!("HMS TLS certificate verification is disabled");
            client_builder = client_builder.danger_accept_invalid_certs(true);
        }

        let client = client_builder
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry: config.retry.clone(),
            max_concurrency: config.max_concurrency.max(1),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Delay before retry number `attempt` (1-based)
    pub fn backoff_delay(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay_ms =
            self.retry.initial_delay_ms as f64 * self.retry.backoff_multiplier.powi(exponent);
        let capped = delay_ms.min(self.retry.max_delay_ms as f64).max(0.0);
        Duration::from_millis(capped as u64)
    }

    /// Retries an operation with exponential backoff
    ///
    /// Only transient errors are retried; anything else is returned at once.
    pub async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_transient() && attempt < max_retries => {
                    attempt += 1;
                    let delay = self.backoff_delay(attempt);
                    crate::log_retry_attempt!(attempt, max_retries, delay.as_millis() as u64, e);
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() => {
                    return Err(SyncError::TransientNetwork(format!(
                        "giving up after {} attempts: {e}",
                        attempt + 1
                    )));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// GETs a JSON document, retrying transient failures
    ///
    /// A 404 yields `Ok(None)` so callers can treat unknown patients as
    /// having no records.
    pub async fn get_json(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: &AuthHeader,
    ) -> Result<Option<Value>> {
        self.retry_request(|| {
            let request = auth.apply(self.client.get(url).query(query));
            async move {
                let response = request.send().await.map_err(classify_reqwest)?;

                if response.status() == StatusCode::NOT_FOUND {
                    return Ok(None);
                }

                let response = ensure_success(response).await?;
                response
                    .json::<Value>()
                    .await
                    .map(Some)
                    .map_err(|e| SyncError::Hms(HmsError::InvalidResponse(e.to_string())))
            }
        })
        .await
    }

    /// Sends a login request built by `build`, returning the JSON body
    ///
    /// `Ok(None)` means the HMS answered but rejected the credentials.
    /// Transient failures are retried like any other request.
    pub async fn post_login<F>(&self, build: F) -> Result<Option<Value>>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        self.retry_request(|| {
            let request = build(&self.client);
            async move {
                let response = request.send().await.map_err(classify_reqwest)?;
                let status = response.status();

                if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS {
                    tracing::warn!(status = %status, "HMS rejected login request");
                    return Ok(None);
                }

                let response = ensure_success(response).await?;
                response
                    .json::<Value>()
                    .await
                    .map(Some)
                    .map_err(|e| SyncError::Hms(HmsError::InvalidResponse(e.to_string())))
            }
        })
        .await
    }

    /// GETs a list of records, either a bare array or wrapped under `envelope`
    pub async fn get_record_list(
        &self,
        url: &str,
        query: &[(&str, String)],
        auth: &AuthHeader,
        envelope: Option<&str>,
    ) -> Result<Vec<Value>> {
        let Some(body) = self.get_json(url, query, auth).await? else {
            tracing::info!(url = %url, "HMS returned 404, treating as no records");
            return Ok(Vec::new());
        };
        unwrap_record_list(body, envelope)
    }

    /// Runs `fetch` for every patient with at most `max_concurrency` in flight
    ///
    /// Results are merged in patient order. A patient whose fetch fails is
    /// listed in [`Fetched::failed_patients`] and the others are kept. The
    /// data type only fails when every patient failed, in which case the
    /// first patient's error is returned.
    pub async fn fan_out<T, F, Fut>(
        &self,
        patient_ids: &[PatientId],
        fetch: F,
    ) -> Result<Fetched<T>>
    where
        F: Fn(PatientId) -> Fut,
        Fut: Future<Output = Result<Fetched<T>>>,
    {
        let per_patient: Vec<(PatientId, Result<Fetched<T>>)> =
            stream::iter(patient_ids.iter().cloned())
                .map(|patient_id| {
                    let fetching = fetch(patient_id.clone());
                    async move { (patient_id, fetching.await) }
                })
                .buffered(self.max_concurrency)
                .collect()
                .await;

        let mut merged = Fetched::default();
        let mut first_error = None;
        let mut succeeded = 0;
        for (patient_id, result) in per_patient {
            match result {
                Ok(fetched) => {
                    succeeded += 1;
                    merged.merge(fetched);
                }
                Err(e) => {
                    tracing::warn!(
                        patient_id = %patient_id,
                        error_kind = e.kind(),
                        error = %e,
                        "Fetch failed for patient, continuing with the rest"
                    );
                    merged.failed_patients.push(PatientFailure::new(patient_id, &e));
                    if first_error.is_none() {
                        first_error = Some(e);
                    }
                }
            }
        }

        match first_error {
            Some(e) if succeeded == 0 => Err(e),
            _ => Ok(merged),
        }
    }
}

/// Extracts the record array from a response body
pub fn unwrap_record_list(body: Value, envelope: Option<&str>) -> Result<Vec<Value>> {
    let list = match envelope {
        Some(key) => match body {
            Value::Object(mut map) => map.remove(key).unwrap_or(Value::Array(Vec::new())),
            other => other,
        },
        None => body,
    };

    match list {
        Value::Array(items) => Ok(items),
        Value::Null => Ok(Vec::new()),
        other => Err(SyncError::Hms(HmsError::InvalidResponse(format!(
            "expected a JSON array of records, got {}",
            json_kind(&other)
        )))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Maps a reqwest transport failure onto the HMS error taxonomy
pub fn classify_reqwest(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Hms(HmsError::Timeout(e.to_string()))
    } else {
        SyncError::Hms(HmsError::ConnectionFailed(e.to_string()))
    }
}

/// Maps a non-success status to an error, reading the body for context
pub async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(SyncError::Hms(classify_status(status, body)))
}

pub fn classify_status(status: StatusCode, body: String) -> HmsError {
    let message = truncate(body, 512);
    if status == StatusCode::TOO_MANY_REQUESTS {
        HmsError::RateLimited(message)
    } else if status.is_server_error() {
        HmsError::ServerError {
            status: status.as_u16(),
            message,
        }
    } else {
        HmsError::ClientError {
            status: status.as_u16(),
            message,
        }
    }
}

fn truncate(mut text: String, max: usize) -> String {
    if text.len() > max {
        let mut cut = max;
        while !text.is_char_boundary(cut) {
            cut -= 1;
        }
        text.truncate(cut);
        text.push_str("...");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_transport(max_retries: usize) -> HmsTransport {
        let config = HmsConfig {
            retry: RetryConfig {
                max_retries,
                initial_delay_ms: 1,
                max_delay_ms: 5,
                backoff_multiplier: 2.0,
            },
            ..HmsConfig::default()
        };
        HmsTransport::new(&config).unwrap()
    }

    #[test]
    fn test_backoff_delay_grows_and_caps() {
        let config = HmsConfig {
            retry: RetryConfig {
                max_retries: 5,
                initial_delay_ms: 100,
                max_delay_ms: 1000,
                backoff_multiplier: 3.0,
            },
            ..HmsConfig::default()
        };
        let transport = HmsTransport::new(&config).unwrap();
        assert_eq!(transport.backoff_delay(1), Duration::from_millis(100));
        assert_eq!(transport.backoff_delay(2), Duration::from_millis(300));
        assert_eq!(transport.backoff_delay(3), Duration::from_millis(900));
        assert_eq!(transport.backoff_delay(4), Duration::from_millis(1000));
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_error() {
        let transport = fast_transport(3);
        let calls = AtomicUsize::new(0);

        let result = transport
            .retry_request(|| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SyncError::Hms(HmsError::Timeout("slow".into())))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_surfaces_transient_after_budget() {
        let transport = fast_transport(2);
        let calls = AtomicUsize::new(0);

        let result: Result<()> = transport
            .retry_request(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::Hms(HmsError::ConnectionFailed("refused".into())))
            })
            .await;

        assert!(matches!(result, Err(SyncError::TransientNetwork(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_does_not_repeat_structural_errors() {
        let transport = fast_transport(3);
        let calls = AtomicUsize::new(0);

        let result: Result<()> = transport
            .retry_request(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SyncError::Hms(HmsError::ClientError {
                    status: 400,
                    message: "bad".into(),
                }))
            })
            .await;

        assert!(matches!(result, Err(SyncError::Hms(HmsError::ClientError { .. }))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fan_out_keeps_patients_that_succeeded() {
        let transport = fast_transport(0);
        let patients = vec![
            PatientId::new("P-1").unwrap(),
            PatientId::new("P-2").unwrap(),
            PatientId::new("P-3").unwrap(),
        ];

        let fetched: Fetched<String> = transport
            .fan_out(&patients, |patient_id| async move {
                if patient_id.as_str() == "P-2" {
                    return Err(SyncError::Hms(HmsError::ClientError {
                        status: 400,
                        message: "bad patient".into(),
                    }));
                }
                let mut fetched = Fetched::default();
                fetched.records.push(patient_id.to_string());
                Ok(fetched)
            })
            .await
            .unwrap();

        assert_eq!(fetched.records, vec!["P-1".to_string(), "P-3".to_string()]);
        assert_eq!(fetched.failed_patients.len(), 1);
        assert_eq!(fetched.failed_patients[0].patient_id.as_str(), "P-2");
        assert_eq!(fetched.failed_patients[0].kind, "hms");
    }

    #[tokio::test]
    async fn test_fan_out_fails_when_every_patient_fails() {
        let transport = fast_transport(0);
        let patients = vec![PatientId::new("P-1").unwrap(), PatientId::new("P-2").unwrap()];

        let result: Result<Fetched<String>> = transport
            .fan_out(&patients, |_| async {
                Err(SyncError::TransientNetwork("unreachable".into()))
            })
            .await;

        assert!(matches!(result, Err(SyncError::TransientNetwork(_))));
    }

    #[test]
    fn test_classify_status() {
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, String::new()),
            HmsError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS, String::new()),
            HmsError::RateLimited(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, String::new()),
            HmsError::ClientError { status: 403, .. }
        ));
    }

    #[test]
    fn test_unwrap_record_list() {
        let wrapped = json!({"data": [{"a": 1}, {"a": 2}]});
        assert_eq!(unwrap_record_list(wrapped, Some("data")).unwrap().len(), 2);

        let bare = json!([{"a": 1}]);
        assert_eq!(unwrap_record_list(bare, None).unwrap().len(), 1);

        let missing = json!({"meta": {}});
        assert!(unwrap_record_list(missing, Some("data")).unwrap().is_empty());

        assert!(unwrap_record_list(json!("oops"), None).is_err());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let text = "é".repeat(10);
        let cut = truncate(text, 5);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_auth_header_debug_is_redacted() {
        let header = AuthHeader::Bearer("secret-token".into());
        assert!(!format!("{header:?}").contains("secret-token"));
    }
}
