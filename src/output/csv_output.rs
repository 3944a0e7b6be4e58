//! CSV result file

use crate::output::traits::{OutputResult, ResultSink, WeatherRow};
use std::path::{Path, PathBuf};

/// Writes rows to a CSV file with a header row
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for CsvSink {
    fn name(&self) -> &str {
        "csv"
    }

    fn write_rows(&mut self, rows: &[WeatherRow]) -> OutputResult<()> {
        let mut writer = csv::Writer::from_path(&self.path)?;

        // serialize() only emits the header with the first record
        if rows.is_empty() {
            writer.write_record(HEADER)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        tracing::debug!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(())
    }
}

/// Column names in output order
pub const HEADER: [&str; 12] = [
    "Key",
    "Query",
    "IdentifiedLocation",
    "Country",
    "LastUpdate",
    "TemperatureC",
    "Humidity",
    "WeatherCondition",
    "WindSpeedKph",
    "WindDirection",
    "UVIndex",
    "Error",
];
