//! Output module for writing harvest results and reports
//!
//! This module handles:
//! - Converting fetch outcomes into fixed-column rows
//! - Writing rows to CSV and to the SQLite results database
//! - Generating markdown summaries and printing run statistics

mod csv_output;
mod markdown;
mod sqlite_output;
pub mod stats;
mod traits;

pub use csv_output::{CsvSink, HEADER};
pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use sqlite_output::SqliteSink;
pub use stats::{load_statistics, print_statistics, RunStatistics};
pub use traits::{OutputError, OutputResult, ResultSink, RunSummary, WeatherRow};

use crate::fetch::{Observation, ResultSet};

/// Converts a result set into rows sorted by key
///
/// Completion order is not reproducible between runs; sorting makes output
/// files comparable.
pub fn rows_from_results(results: ResultSet<Observation>) -> Vec<WeatherRow> {
    results
        .into_sorted()
        .iter()
        .map(WeatherRow::from)
        .collect()
}
