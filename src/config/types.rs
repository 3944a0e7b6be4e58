use crate::ConfigError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable consulted when `api.api-key` is not set
pub const API_KEY_ENV: &str = "WEATHER_API_KEY";

/// Main configuration structure for Weather-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub regions: Option<RegionsConfig>,
}

impl Config {
    /// Returns the API key, or an error if none was configured
    ///
    /// Checked before any fetch is dispatched so that a missing credential
    /// is a run-level failure rather than one failure row per key.
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        match self.api.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(ConfigError::MissingCredential(API_KEY_ENV)),
        }
    }
}

/// Weather API endpoint configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Endpoint URL, queried with `key` and `q` parameters
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// API credential (falls back to the `WEATHER_API_KEY` environment variable)
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Region appended to every key to build the query string
    #[serde(rename = "region-qualifier", default = "default_region_qualifier")]
    pub region_qualifier: String,
}

/// Fetch behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Worker-pool width: maximum number of in-flight requests
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Total attempts per key, including the first
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles for each further retry (milliseconds)
    #[serde(rename = "backoff-base-ms", default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Randomize retry delays
    #[serde(default)]
    pub jitter: bool,
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            jitter: false,
        }
    }
}

/// Key file configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the CSV key file
    #[serde(rename = "keys-path")]
    pub keys_path: PathBuf,

    /// Header of the key column
    #[serde(default = "default_column")]
    pub column: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path of the CSV results file
    #[serde(rename = "results-path")]
    pub results_path: PathBuf,

    /// Optional SQLite database recording runs and results
    #[serde(rename = "database-path", default)]
    pub database_path: Option<PathBuf>,

    /// Optional markdown summary report
    #[serde(rename = "summary-path", default)]
    pub summary_path: Option<PathBuf>,
}

/// Region hierarchy crawl configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RegionsConfig {
    /// API root serving `provinces.json`, `regencies/<code>.json`, `districts/<code>.json`
    #[serde(rename = "base-url", default = "default_regions_base_url")]
    pub base_url: String,

    /// Province whose districts become the key list
    #[serde(default = "default_province")]
    pub province: String,

    /// Per-request timeout (milliseconds)
    #[serde(rename = "timeout-ms", default = "default_regions_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        Self {
            base_url: default_regions_base_url(),
            province: default_province(),
            timeout_ms: default_regions_timeout_ms(),
        }
    }
}

fn default_region_qualifier() -> String {
    "Jawa Timur".to_string()
}

fn default_workers() -> usize {
    10
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_column() -> String {
    "Kecamatan".to_string()
}

fn default_regions_base_url() -> String {
    "https://wilayah.id/api".to_string()
}

fn default_province() -> String {
    "JAWA TIMUR".to_string()
}

fn default_regions_timeout_ms() -> u64 {
    15_000
}
