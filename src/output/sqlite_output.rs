//! SQLite-based result sink
//!
//! This module provides a sink that records each run and its rows in the
//! SQLite storage backend.

use crate::output::traits::{OutputResult, ResultSink, WeatherRow};
use crate::storage::Storage;

/// SQLite-based result sink
///
/// Every call to `write_rows` creates a new run, inserts all rows in one
/// transaction, and marks the run completed. If the insert fails the run is
/// marked failed.
pub struct SqliteSink<S: Storage> {
    storage: S,
    config_hash: String,
    last_run_id: Option<i64>,
}

impl<S: Storage> SqliteSink<S> {
    /// Creates a new SQLite sink
    ///
    /// # Arguments
    ///
    /// * `storage` - The storage backend to use
    /// * `config_hash` - Hash of the configuration the run was made with
    pub fn new(storage: S, config_hash: &str) -> Self {
        Self {
            storage,
            config_hash: config_hash.to_string(),
            last_run_id: None,
        }
    }

    /// ID of the run created by the last `write_rows`
    pub fn last_run_id(&self) -> Option<i64> {
        self.last_run_id
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }
}

impl<S: Storage> ResultSink for SqliteSink<S> {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn write_rows(&mut self, rows: &[WeatherRow]) -> OutputResult<()> {
        let run_id = self
            .storage
            .create_run(&self.config_hash, rows.len() as u64)?;
        self.last_run_id = Some(run_id);

        if let Err(e) = self.storage.insert_results(run_id, rows) {
            tracing::error!("Failed to record results for run {}: {}", run_id, e);
            self.storage.fail_run(run_id)?;
            return Err(e.into());
        }

        self.storage.complete_run(run_id)?;
        tracing::debug!("Recorded {} rows as run {}", rows.len(), run_id);
        Ok(())
    }
}
