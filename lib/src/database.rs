// lib/src/database.rs

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::{debug, info};

use medrec_models::RecordResult;

use crate::config::DatabaseConfig;

/// Table definitions, created when missing. Existing tables are left untouched.
const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS Patients (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        age INTEGER NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS Visits (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id TEXT NOT NULL REFERENCES Patients(id),
        date TEXT NOT NULL,
        reason TEXT NOT NULL,
        doctor_name TEXT NOT NULL,
        hospital TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS Treatments (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id TEXT NOT NULL REFERENCES Patients(id),
        date TEXT NOT NULL,
        treatment TEXT NOT NULL,
        outcome TEXT NOT NULL,
        hospital TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS Diagnostics (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        patient_id TEXT NOT NULL REFERENCES Patients(id),
        date TEXT NOT NULL,
        diagnosis TEXT NOT NULL,
        specialist TEXT NOT NULL,
        hospital TEXT NOT NULL
    )",
];

/// Handle to the SQLite store. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens a pool for `config.url`, creating the database file if needed.
    pub async fn connect(config: &DatabaseConfig) -> RecordResult<Self> {
        let options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;
        info!("Connected to {} (max {} connections)", config.url, config.max_connections);
        Ok(Database { pool })
    }

    /// A private in-memory database on a single long-lived connection.
    ///
    /// Every SQLite in-memory connection is its own database, so the pool must
    /// never open a second one or recycle the first.
    pub async fn in_memory() -> RecordResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the Patients, Visits, Treatments and Diagnostics tables if they are missing.
    pub async fn ensure_schema(&self) -> RecordResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        debug!("Schema ready");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    #[tokio::test]
    async fn test_ensure_schema_is_idempotent() {
        let db = Database::in_memory().await.unwrap();
        db.ensure_schema().await.unwrap();
        db.ensure_schema().await.unwrap();

        let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name")
            .fetch_all(db.pool())
            .await
            .unwrap();
        let tables: Vec<String> = rows.iter().map(|r| r.get("name")).collect();
        assert_eq!(tables, vec!["Diagnostics", "Patients", "Treatments", "Visits"]);
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let db = Database::in_memory().await.unwrap();
        db.ensure_schema().await.unwrap();
        let result = sqlx::query(
            "INSERT INTO Visits (patient_id, date, reason, doctor_name, hospital) VALUES ('ghost', '2024-01-01', 'x', 'y', 'z')",
        )
        .execute(db.pool())
        .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_connect_creates_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("records.db").display());
        let db = Database::connect(&DatabaseConfig { url, max_connections: 2 }).await.unwrap();
        db.ensure_schema().await.unwrap();
        assert!(dir.path().join("records.db").exists());
        db.close().await;
    }
}
