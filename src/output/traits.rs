//! Output sink traits and types
//!
//! This module defines the trait interface for result sinks and the data
//! structures shared by every output format.

use crate::fetch::{FetchOutcome, Observation};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Failed to write output: {0}")]
    Write(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One output row per key
///
/// Column names and order are fixed. Failure rows leave every data column
/// empty and carry the error description; success rows have an empty
/// `Error` column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherRow {
    #[serde(rename = "Key")]
    pub key: String,

    #[serde(rename = "Query")]
    pub query: String,

    #[serde(rename = "IdentifiedLocation")]
    pub location: String,

    #[serde(rename = "Country")]
    pub country: String,

    #[serde(rename = "LastUpdate")]
    pub last_update: String,

    #[serde(rename = "TemperatureC")]
    pub temperature_c: Option<f64>,

    #[serde(rename = "Humidity")]
    pub humidity: Option<f64>,

    #[serde(rename = "WeatherCondition")]
    pub condition: String,

    #[serde(rename = "WindSpeedKph")]
    pub wind_kph: Option<f64>,

    #[serde(rename = "WindDirection")]
    pub wind_dir: String,

    #[serde(rename = "UVIndex")]
    pub uv: Option<f64>,

    #[serde(rename = "Error")]
    pub error: String,
}

impl WeatherRow {
    pub fn is_failure(&self) -> bool {
        !self.error.is_empty()
    }
}

impl From<&FetchOutcome<Observation>> for WeatherRow {
    fn from(outcome: &FetchOutcome<Observation>) -> Self {
        let mut row = WeatherRow {
            key: outcome.key().to_string(),
            query: outcome.query().to_string(),
            ..WeatherRow::default()
        };

        match outcome {
            FetchOutcome::Success { record, .. } => {
                row.location = record.location.clone();
                row.country = record.country.clone();
                row.last_update = record.last_updated.clone();
                row.temperature_c = record.temperature_c;
                row.humidity = record.humidity;
                row.condition = record.condition.clone();
                row.wind_kph = record.wind_kph;
                row.wind_dir = record.wind_dir.clone();
                row.uv = record.uv;
            }
            FetchOutcome::Failure { error, .. } => {
                row.error = error.clone();
            }
        }

        row
    }
}

/// A destination for the rows of one run
pub trait ResultSink {
    /// Short name used in log messages
    fn name(&self) -> &str;

    /// Writes every row of a run
    fn write_rows(&mut self, rows: &[WeatherRow]) -> OutputResult<()>;
}

/// Summary statistics for one run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub run_id: Option<i64>,
    pub started_at: String,
    pub finished_at: String,
    pub duration_seconds: f64,
    pub config_hash: String,

    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,

    /// `(key, error)` for every failed row, in row order
    pub failures: Vec<(String, String)>,
}

impl RunSummary {
    /// Builds a summary from the rows of a finished run
    pub fn from_rows(
        rows: &[WeatherRow],
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
        config_hash: &str,
    ) -> Self {
        let failures: Vec<(String, String)> = rows
            .iter()
            .filter(|r| r.is_failure())
            .map(|r| (r.key.clone(), r.error.clone()))
            .collect();
        let total = rows.len() as u64;
        let failed = failures.len() as u64;

        Self {
            run_id: None,
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            duration_seconds: (finished_at - started_at).num_milliseconds().max(0) as f64 / 1000.0,
            config_hash: config_hash.to_string(),
            total,
            succeeded: total - failed,
            failed,
            failures,
        }
    }

    /// Percentage of keys fetched successfully
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.succeeded as f64 / self.total as f64) * 100.0
        }
    }

    /// Percentage of keys that failed
    pub fn error_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.failed as f64 / self.total as f64) * 100.0
        }
    }

    /// Failure count against the total, printed after every run
    pub fn failure_line(&self) -> String {
        format!("{} of {} locations failed", self.failed, self.total)
    }
}
