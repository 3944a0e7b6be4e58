//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::output::WeatherRow;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus};
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const RUN_COLUMNS: &str = "id, started_at, finished_at, config_hash, status, total_keys";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = init_database(path)?;
        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
        total_keys: row.get::<_, i64>(5)? as u64,
    })
}

fn result_from_row(row: &Row<'_>) -> rusqlite::Result<WeatherRow> {
    Ok(WeatherRow {
        key: row.get(0)?,
        query: row.get(1)?,
        location: row.get(2)?,
        country: row.get(3)?,
        last_update: row.get(4)?,
        temperature_c: row.get(5)?,
        humidity: row.get(6)?,
        condition: row.get(7)?,
        wind_kph: row.get(8)?,
        wind_dir: row.get(9)?,
        uv: row.get(10)?,
        error: row.get(11)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str, total_keys: u64) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status, total_keys) VALUES (?1, ?2, ?3, ?4)",
            params![
                now,
                config_hash,
                RunStatus::Running.to_db_string(),
                total_keys as i64
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let query = format!("SELECT {} FROM runs WHERE id = ?1", RUN_COLUMNS);
        self.conn
            .query_row(&query, params![run_id], run_from_row)
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let query = format!("SELECT {} FROM runs ORDER BY id DESC LIMIT 1", RUN_COLUMNS);
        let run = self.conn.query_row(&query, [], run_from_row).optional()?;
        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Completed)
    }

    fn fail_run(&mut self, run_id: i64) -> StorageResult<()> {
        self.finish_run(run_id, RunStatus::Failed)
    }

    // ===== Results =====

    fn insert_results(&mut self, run_id: i64, rows: &[WeatherRow]) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO results (run_id, key, query, location, country, last_update,
                 temperature_c, humidity, condition, wind_kph, wind_dir, uv, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            )?;
            for row in rows {
                stmt.execute(params![
                    run_id,
                    row.key,
                    row.query,
                    row.location,
                    row.country,
                    row.last_update,
                    row.temperature_c,
                    row.humidity,
                    row.condition,
                    row.wind_kph,
                    row.wind_dir,
                    row.uv,
                    row.error,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn load_results(&self, run_id: i64) -> StorageResult<Vec<WeatherRow>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, query, location, country, last_update, temperature_c, humidity,
             condition, wind_kph, wind_dir, uv, error
             FROM results WHERE run_id = ?1 ORDER BY key",
        )?;
        let rows = stmt.query_map(params![run_id], result_from_row)?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }

        Ok(results)
    }

    fn count_results(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE run_id = ?1",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn count_failures(&self, run_id: i64) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM results WHERE run_id = ?1 AND error != ''",
            params![run_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn failed_results(&self, run_id: i64) -> StorageResult<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, error FROM results WHERE run_id = ?1 AND error != '' ORDER BY key",
        )?;
        let rows = stmt.query_map(params![run_id], |row| Ok((row.get(0)?, row.get(1)?)))?;

        let mut failures = Vec::new();
        for row in rows {
            failures.push(row?);
        }

        Ok(failures)
    }
}

/// Initializes or opens a database at the given path
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(Connection)` - Successfully opened/created database
/// * `Err(rusqlite::Error)` - Failed to open database
pub fn init_database(path: &Path) -> Result<Connection, rusqlite::Error> {
    let conn = Connection::open(path)?;

    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA foreign_keys = ON;
    ",
    )?;

    initialize_schema(&conn)?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, error: &str) -> WeatherRow {
        WeatherRow {
            key: key.to_string(),
            query: format!("{}, Jawa Timur", key),
            temperature_c: if error.is_empty() { Some(30.5) } else { None },
            error: error.to_string(),
            ..WeatherRow::default()
        }
    }

    #[test]
    fn test_create_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", 2).unwrap();
        assert!(run_id > 0);

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.total_keys, 2);
        assert!(run.finished_at.is_none());
    }

    #[test]
    fn test_complete_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", 0).unwrap();
        storage.complete_run(run_id).unwrap();

        let run = storage.get_latest_run().unwrap().unwrap();
        assert_eq!(run.id, run_id);
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.finished_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        assert!(matches!(storage.get_run(42), Err(StorageError::RunNotFound(42))));
        assert!(matches!(
            storage.complete_run(42),
            Err(StorageError::RunNotFound(42))
        ));
        assert!(storage.get_latest_run().unwrap().is_none());
    }

    #[test]
    fn test_insert_and_count_results() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", 3).unwrap();
        storage
            .insert_results(
                run_id,
                &[
                    row("Gubeng", ""),
                    row("Beta", "HTTP 503 Service Unavailable after 3 attempts"),
                    row("Alpha", ""),
                ],
            )
            .unwrap();

        assert_eq!(storage.count_results(run_id).unwrap(), 3);
        assert_eq!(storage.count_failures(run_id).unwrap(), 1);
        assert_eq!(
            storage.failed_results(run_id).unwrap(),
            vec![(
                "Beta".to_string(),
                "HTTP 503 Service Unavailable after 3 attempts".to_string()
            )]
        );

        let loaded = storage.load_results(run_id).unwrap();
        let keys: Vec<&str> = loaded.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Alpha", "Beta", "Gubeng"]);
        assert_eq!(loaded[0].temperature_c, Some(30.5));
        assert_eq!(loaded[1].temperature_c, None);
    }

    #[test]
    fn test_duplicate_key_in_run_rejected() {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let run_id = storage.create_run("test_hash", 2).unwrap();
        let result = storage.insert_results(run_id, &[row("Alpha", ""), row("Alpha", "")]);
        assert!(result.is_err());
        assert_eq!(storage.count_results(run_id).unwrap(), 0);
    }
}
