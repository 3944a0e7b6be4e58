//! Weather-Harvest: bounded concurrent weather collection per district
//!
//! This crate resolves a list of query keys (district names), fetches current
//! weather for every key through a bounded pool of workers with per-request
//! retry, and records one result row per key, failed keys included.

pub mod config;
pub mod fetch;
pub mod keys;
pub mod output;
pub mod regions;
pub mod storage;

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Weather-Harvest operations
///
/// Per-key fetch failures never appear here: they are captured as
/// [`fetch::FetchOutcome::Failure`] records. This type covers run-level
/// failures that stop a run before or after the fetch phase.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("No keys found in {}", path.display())]
    NoKeys { path: PathBuf },

    #[error("Column '{column}' not found and {} has no columns", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("Province not found: {0}")]
    ProvinceNotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Client error: {0}")]
    Client(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Missing API key: set api.api-key or the {0} environment variable")]
    MissingCredential(&'static str),
}

/// Result type alias for Weather-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use fetch::{BoundedMapper, FetchClient, FetchOutcome, ResultSet, WeatherClient};
pub use keys::{normalize_keys, Key};
