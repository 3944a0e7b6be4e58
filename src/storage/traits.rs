//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::output::WeatherRow;
use crate::storage::RunRecord;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new run
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file
    /// * `total_keys` - Number of keys the run will fetch
    ///
    /// # Returns
    ///
    /// The ID of the newly created run
    fn create_run(&mut self, config_hash: &str, total_keys: u64) -> StorageResult<i64>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Marks a run as completed with a finish timestamp
    fn complete_run(&mut self, run_id: i64) -> StorageResult<()>;

    /// Marks a run as failed with a finish timestamp
    fn fail_run(&mut self, run_id: i64) -> StorageResult<()>;

    // ===== Results =====

    /// Inserts result rows for a run in a single transaction
    fn insert_results(&mut self, run_id: i64, rows: &[WeatherRow]) -> StorageResult<()>;

    /// Loads all result rows of a run, ordered by key
    fn load_results(&self, run_id: i64) -> StorageResult<Vec<WeatherRow>>;

    /// Counts result rows of a run
    fn count_results(&self, run_id: i64) -> StorageResult<u64>;

    /// Counts failed result rows of a run
    fn count_failures(&self, run_id: i64) -> StorageResult<u64>;

    /// Returns `(key, error)` for every failed row of a run, ordered by key
    fn failed_results(&self, run_id: i64) -> StorageResult<Vec<(String, String)>>;
}
