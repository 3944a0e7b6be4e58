//! Statistics from the results database
//!
//! This module provides functionality for extracting and displaying run
//! statistics from the storage layer.

use crate::storage::{RunRecord, Storage};
use crate::HarvestError;

/// Statistics for the most recent run
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub run: RunRecord,

    /// Rows recorded for the run
    pub total_results: u64,

    /// Rows with a non-empty error
    pub failed_results: u64,

    /// `(key, error)` for every failed row
    pub failures: Vec<(String, String)>,
}

/// Loads statistics for the latest run
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - No runs recorded, or the query failed
pub fn load_statistics(storage: &dyn Storage) -> Result<RunStatistics, HarvestError> {
    let run = storage
        .get_latest_run()?
        .ok_or_else(|| HarvestError::Storage("No harvest runs found in database".to_string()))?;

    let total_results = storage.count_results(run.id)?;
    let failed_results = storage.count_failures(run.id)?;
    let failures = storage.failed_results(run.id)?;

    Ok(RunStatistics {
        run,
        total_results,
        failed_results,
        failures,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Harvest Statistics ===\n");

    println!("Run {}:", stats.run.id);
    println!("  Status: {}", stats.run.status.to_db_string());
    println!("  Started: {}", stats.run.started_at);
    if let Some(finished) = &stats.run.finished_at {
        println!("  Finished: {}", finished);
    }
    println!("  Config hash: {}", stats.run.config_hash);
    println!();

    let succeeded = stats.total_results - stats.failed_results;
    let success_rate = if stats.total_results > 0 {
        (succeeded as f64 / stats.total_results as f64) * 100.0
    } else {
        0.0
    };

    println!("Results:");
    println!("  Keys: {}", stats.run.total_keys);
    println!("  Rows recorded: {}", stats.total_results);
    println!("  Failed: {}", stats.failed_results);
    println!(
        "  Success Rate: {:.1}% ({} / {})",
        success_rate, succeeded, stats.total_results
    );

    if !stats.failures.is_empty() {
        println!();
        println!("Failed Keys ({}):", stats.failures.len());
        for (key, error) in &stats.failures {
            println!("  - {}: {}", key, error);
        }
    }
}
