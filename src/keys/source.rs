//! Key file reading and writing
//!
//! Key files are CSV with a header row. The key column is looked up by name;
//! when the named column is missing the first column is used instead.

use crate::keys::{normalize_keys, Key};
use crate::HarvestError;
use std::path::Path;

/// Loads and normalizes keys from a CSV key file
///
/// # Arguments
///
/// * `path` - Path to the CSV file
/// * `column` - Header name of the key column
///
/// # Returns
///
/// * `Ok(Vec<Key>)` - Normalized keys (possibly empty)
/// * `Err(HarvestError)` - The file could not be read or has no columns
pub fn load_keys(path: &Path, column: &str) -> Result<Vec<Key>, HarvestError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    let index = match headers.iter().position(|h| h.trim() == column) {
        Some(index) => index,
        None if !headers.is_empty() => {
            tracing::warn!(
                "Column '{}' not found in {}, using first column '{}'",
                column,
                path.display(),
                &headers[0]
            );
            0
        }
        None => {
            return Err(HarvestError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            })
        }
    };

    let mut raw = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            raw.push(value.to_string());
        }
    }

    let keys = normalize_keys(&raw);
    tracing::debug!(
        "Loaded {} raw entries, {} unique keys from {}",
        raw.len(),
        keys.len(),
        path.display()
    );

    Ok(keys)
}

/// Writes keys to a single-column CSV key file
pub fn write_keys(path: &Path, column: &str, keys: &[Key]) -> Result<(), HarvestError> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([column])?;
    for key in keys {
        writer.write_record([key.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_named_column() {
        let file = create_temp_csv("No,Kecamatan\n1,Gubeng\n2, Sawahan \n3,Gubeng\n4,\n");
        let keys = load_keys(file.path(), "Kecamatan").unwrap();
        let names: Vec<&str> = keys.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, vec!["Gubeng", "Sawahan"]);
    }

    #[test]
    fn test_falls_back_to_first_column() {
        let file = create_temp_csv("District\nBubutan\nGenteng\n");
        let keys = load_keys(file.path(), "Kecamatan").unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].as_str(), "Bubutan");
    }

    #[test]
    fn test_header_only_file_yields_no_keys() {
        let file = create_temp_csv("Kecamatan\n");
        let keys = load_keys(file.path(), "Kecamatan").unwrap();
        assert!(keys.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = load_keys(Path::new("/nonexistent/keys.csv"), "Kecamatan");
        assert!(result.is_err());
    }

    #[test]
    fn test_write_then_load() {
        let file = NamedTempFile::new().unwrap();
        let keys = normalize_keys(["Tandes", "Asemrowo"]);
        write_keys(file.path(), "Kecamatan", &keys).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(content, "Kecamatan\nAsemrowo\nTandes\n");
        assert_eq!(load_keys(file.path(), "Kecamatan").unwrap(), keys);
    }
}
