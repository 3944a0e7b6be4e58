//! Weather API fetch client
//!
//! This module handles all requests to the current-weather endpoint,
//! including:
//! - Building per-worker HTTP clients sized for the worker pool
//! - Deriving the query string from a key
//! - Retry with exponential backoff for transient failures
//! - Extracting the fixed field set from the response body
//! - Error classification into readable failure descriptions

use crate::config::{ApiConfig, FetchConfig};
use crate::fetch::client::{FetchClient, FetchOutcome};
use crate::fetch::retry::{parse_retry_after, RetryPolicy};
use crate::keys::Key;
use crate::HarvestError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;

/// Fields extracted from a successful weather lookup
///
/// Fields missing from the upstream response are empty strings or `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// `"<name>, <region>"` as identified by the API
    pub location: String,
    pub country: String,
    pub last_updated: String,
    pub temperature_c: Option<f64>,
    pub humidity: Option<f64>,
    pub condition: String,
    pub wind_kph: Option<f64>,
    pub wind_dir: String,
    pub uv: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct WeatherResponse {
    #[serde(default)]
    location: Option<LocationPayload>,
    #[serde(default)]
    current: Option<CurrentPayload>,
}

#[derive(Debug, Default, Deserialize)]
struct LocationPayload {
    name: Option<String>,
    region: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CurrentPayload {
    last_updated: Option<String>,
    temp_c: Option<f64>,
    humidity: Option<f64>,
    condition: Option<ConditionPayload>,
    wind_kph: Option<f64>,
    wind_dir: Option<String>,
    uv: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct ConditionPayload {
    text: Option<String>,
}

/// Error envelope returned by the API alongside 4xx statuses
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl WeatherResponse {
    fn into_observation(self) -> Observation {
        let location = self.location.unwrap_or_default();
        let current = self.current.unwrap_or_default();

        let label = [location.name, location.region]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ");

        Observation {
            location: label,
            country: location.country.unwrap_or_default(),
            last_updated: current.last_updated.unwrap_or_default(),
            temperature_c: current.temp_c,
            humidity: current.humidity,
            condition: current
                .condition
                .and_then(|c| c.text)
                .unwrap_or_default(),
            wind_kph: current.wind_kph,
            wind_dir: current.wind_dir.unwrap_or_default(),
            uv: current.uv,
        }
    }
}

/// Parses a response body into an observation
fn parse_observation(body: &[u8]) -> Result<Observation, serde_json::Error> {
    serde_json::from_slice::<WeatherResponse>(body).map(WeatherResponse::into_observation)
}

/// Extracts `error.message` from an API error body, if present
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorEnvelope>(body)
        .ok()?
        .error
        .message
        .filter(|m| !m.trim().is_empty())
}

/// Failure of a single attempt
#[derive(Debug)]
enum AttemptError {
    /// Connection, timeout, or body read failure; the URL is stripped
    /// because its query string carries the API key
    Transport(reqwest::Error),

    /// Non-success HTTP status
    Status {
        status: StatusCode,
        retry_after: Option<Duration>,
        detail: Option<String>,
    },

    /// The body was not the expected JSON document
    Malformed(String),
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(e) => !e.is_builder(),
            Self::Status { status, .. } => RetryPolicy::is_retryable_status(*status),
            Self::Malformed(_) => false,
        }
    }

    /// Server-requested delay, honored only on 429 and 503
    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Status {
                status,
                retry_after,
                ..
            } if matches!(status.as_u16(), 429 | 503) => *retry_after,
            _ => None,
        }
    }

    /// Final description recorded in the failure row
    fn describe(&self, attempts: u32) -> String {
        if self.is_retryable() {
            format!("{} after {}", self, attempts_label(attempts))
        } else {
            self.to_string()
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) if e.is_timeout() => write!(f, "request timed out"),
            Self::Transport(e) if e.is_connect() => write!(f, "connection failed: {}", e),
            Self::Transport(e) => write!(f, "request failed: {}", e),
            Self::Status {
                status,
                detail: Some(detail),
                ..
            } => write!(f, "HTTP {}: {}", status, detail),
            Self::Status { status, .. } => write!(f, "HTTP {}", status),
            Self::Malformed(e) => write!(f, "malformed response body: {}", e),
        }
    }
}

fn attempts_label(attempts: u32) -> String {
    if attempts == 1 {
        "1 attempt".to_string()
    } else {
        format!("{} attempts", attempts)
    }
}

/// Resilient client for the current-weather endpoint
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Timeout / connection error | Retry with backoff |
/// | HTTP 429, 500, 502, 503, 504 | Retry with backoff (honoring `Retry-After`) |
/// | Other HTTP 4xx/5xx | Immediate failure |
/// | Malformed JSON body | Immediate failure |
///
/// Once attempts are exhausted the last error becomes the failure
/// description. `fetch` never returns an error.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    endpoint: Url,
    api_key: String,
    region_qualifier: String,
    timeout: Duration,
    pool_size: usize,
    retry: RetryPolicy,
}

impl WeatherClient {
    /// Creates a weather client
    ///
    /// # Arguments
    ///
    /// * `api` - Endpoint and query qualifier
    /// * `api_key` - API credential
    /// * `fetch` - Timeout, retry and pool sizing
    ///
    /// # Returns
    ///
    /// * `Ok(WeatherClient)` - Client ready to open sessions
    /// * `Err(HarvestError)` - The endpoint URL is invalid
    pub fn new(api: &ApiConfig, api_key: &str, fetch: &FetchConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            endpoint: Url::parse(&api.base_url)?,
            api_key: api_key.to_string(),
            region_qualifier: api.region_qualifier.trim().to_string(),
            timeout: fetch.timeout(),
            pool_size: fetch.workers.max(1),
            retry: RetryPolicy::from_config(fetch),
        })
    }

    /// Replaces the retry policy
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Sends one request and interprets the response
    async fn attempt(&self, client: &Client, query: &str) -> Result<Observation, AttemptError> {
        let response = client
            .get(self.endpoint.clone())
            .query(&[("key", self.api_key.as_str()), ("q", query)])
            .send()
            .await
            .map_err(|e| AttemptError::Transport(e.without_url()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let detail = response
                .text()
                .await
                .ok()
                .and_then(|body| api_error_message(&body));
            return Err(AttemptError::Status {
                status,
                retry_after,
                detail,
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| AttemptError::Transport(e.without_url()))?;
        parse_observation(&body).map_err(|e| AttemptError::Malformed(e.to_string()))
    }
}

#[async_trait]
impl FetchClient for WeatherClient {
    type Session = Client;
    type Record = Observation;

    /// Builds the worker's connection pool
    fn open_session(&self) -> Result<Client, HarvestError> {
        let client = Client::builder()
            .user_agent(concat!("weather-harvest/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .pool_max_idle_per_host(self.pool_size)
            .gzip(true)
            .build()
            .map_err(|e| HarvestError::Client(format!("failed to build HTTP client: {}", e)))?;
        Ok(client)
    }

    fn query_for(&self, key: &Key) -> String {
        if self.region_qualifier.is_empty() {
            key.to_string()
        } else {
            format!("{}, {}", key, self.region_qualifier)
        }
    }

    async fn fetch(&self, session: &Client, key: &Key) -> FetchOutcome<Observation> {
        let query = self.query_for(key);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.attempt(session, &query).await {
                Ok(observation) => {
                    if attempts > 1 {
                        tracing::debug!(key = %key, attempts, "Request succeeded after retry");
                    }
                    return FetchOutcome::success(key.clone(), query, observation);
                }
                Err(e) if e.is_retryable() && self.retry.should_retry(attempts) => {
                    let delay = self.retry.delay_for(attempts, e.retry_after());
                    tracing::debug!(
                        key = %key,
                        attempt = attempts,
                        max_attempts = self.retry.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    let error = e.describe(attempts);
                    tracing::debug!(key = %key, error = %error, "Request failed");
                    return FetchOutcome::failure(key.clone(), query, error);
                }
            }
        }
    }
}
