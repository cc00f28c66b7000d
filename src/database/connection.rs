//! Local database connection
//!
//! This module provides the embedded SQLite backend used for local development
//! and local builds.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use rusqlite::Connection;
use tracing::debug;

use crate::database::client::{DatabaseClient, SqlStatement};
use crate::error::ClientError;

const FILE_URL_PREFIX: &str = "file://";

/// Build a `file://` URL for a path
pub fn file_url(path: &Path) -> String {
    format!("{}{}", FILE_URL_PREFIX, path.display())
}

/// Extract the file path from a `file://` URL
pub fn database_path_from_url(url: &str) -> Result<PathBuf> {
    url.strip_prefix(FILE_URL_PREFIX)
        .filter(|p| !p.is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("Unsupported local database URL '{}'", url))
}

/// Embedded SQLite database
///
/// `LocalDatabase` wraps a single rusqlite connection behind a mutex so it can be
/// shared between the registry and seed executors.
pub struct LocalDatabase {
    conn: Mutex<Connection>,
}

impl LocalDatabase {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    /// Parent directories of the file are created as needed.
    pub fn open(path: Option<&Path>) -> Result<Self> {
        let conn = match path {
            Some(p) => {
                if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        anyhow!("Failed to create database directory '{}': {}", parent.display(), e)
                    })?;
                }
                Connection::open(p)
                    .map_err(|e| anyhow!("Failed to open database at '{}': {}", p.display(), e))?
            }
            None => Connection::open_in_memory()
                .map_err(|e| anyhow!("Failed to create in-memory database: {}", e))?,
        };

        configure(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open the database a `file://` URL points at
    pub fn open_url(url: &str) -> Result<Self> {
        let path = database_path_from_url(url)?;
        Self::open(Some(&path))
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, ClientError> {
        self.conn.lock().map_err(|_| ClientError::Poisoned)
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let conn = self.lock()?;
        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                [table_name],
                |row| row.get(0),
            )
            .map_err(|e| anyhow!("Failed to check table existence: {}", e))?;
        Ok(count > 0)
    }

    /// Get the row count for a table
    pub fn table_count(&self, table_name: &str) -> Result<u64> {
        let conn = self.lock()?;
        let query = format!("SELECT COUNT(*) FROM \"{}\"", table_name.replace('"', "\"\""));
        let count: u64 = conn
            .query_row(&query, [], |row| row.get(0))
            .map_err(|e| anyhow!("Failed to get table count: {}", e))?;
        Ok(count)
    }

    /// Names of all user tables, sorted
    pub fn table_names(&self) -> Result<Vec<String>> {
        self.names_from_master(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            None,
        )
    }

    /// Names of the explicitly created indexes on a table, sorted
    pub fn index_names(&self, table_name: &str) -> Result<Vec<String>> {
        self.names_from_master(
            "SELECT name FROM sqlite_master WHERE type='index' AND tbl_name=?1 AND sql IS NOT NULL ORDER BY name",
            Some(table_name),
        )
    }

    fn names_from_master(&self, sql: &str, table_name: Option<&str>) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| anyhow!("Failed to prepare schema query: {}", e))?;
        let rows = stmt
            .query_map(rusqlite::params_from_iter(table_name), |row| row.get(0))
            .map_err(|e| anyhow!("Failed to query schema: {}", e))?;

        rows.collect::<Result<Vec<String>, _>>()
            .map_err(|e| anyhow!("Failed to read schema row: {}", e))
    }
}

/// Configure the connection with the settings the engine relies on
fn configure(conn: &Connection) -> Result<()> {
    // Enable WAL mode for better concurrent read/write performance
    let _: String = conn
        .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
        .map_err(|e| anyhow!("Failed to set journal mode: {}", e))?;

    conn.execute("PRAGMA synchronous=NORMAL", [])
        .map_err(|e| anyhow!("Failed to set synchronous mode: {}", e))?;

    // Foreign keys are enforced; schema recreation defers them per batch
    conn.execute("PRAGMA foreign_keys=ON", [])
        .map_err(|e| anyhow!("Failed to enable foreign keys: {}", e))?;

    Ok(())
}

#[async_trait]
impl DatabaseClient for LocalDatabase {
    async fn run(&self, statement: &SqlStatement) -> Result<(), ClientError> {
        let conn = self.lock()?;
        conn.execute_batch(statement.as_str())?;
        Ok(())
    }

    async fn batch(&self, statements: &[SqlStatement]) -> Result<(), ClientError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for statement in statements {
            tx.execute_batch(statement.as_str())?;
        }
        tx.commit()?;
        debug!("Committed batch of {} statements", statements.len());
        Ok(())
    }
}
