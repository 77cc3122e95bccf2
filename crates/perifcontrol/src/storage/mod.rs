//! Storage layer for perifcontrol.
//!
//! Every collection lives under a fixed key as one JSON array. This module
//! provides the [`KeyValueStore`] abstraction over those blobs, a
//! `SQLite`-backed implementation for real use and an in-memory one for tests.
//! Both enforce a byte quota over the sum of stored keys and values.

mod memory;
pub mod migrations;
pub mod schema;

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};

pub use memory::MemoryStore;

/// A persistent string-to-string store.
///
/// Values are whole JSON documents; the store never looks inside them.
pub trait KeyValueStore {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::QuotaExceeded`] if the write would push the store
    /// past its quota, or an error if the underlying store fails. The
    /// previous value is left untouched on failure.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn remove(&self, key: &str) -> Result<bool>;

    /// All keys, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn keys(&self) -> Result<Vec<String>>;

    /// Sum of key and value lengths in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying store fails.
    fn total_size(&self) -> Result<usize>;

    /// Quota in bytes; 0 means unlimited.
    fn quota(&self) -> usize;
}

/// Check that replacing `old_len` bytes with a `key`/`value` entry stays within quota.
pub(crate) fn check_quota(
    key: &str,
    value: &str,
    current_total: usize,
    old_entry: Option<usize>,
    quota: usize,
) -> Result<()> {
    if quota == 0 {
        return Ok(());
    }
    let required = current_total - old_entry.unwrap_or(0) + key.len() + value.len();
    if required > quota {
        return Err(Error::QuotaExceeded {
            key: key.to_string(),
            required,
            quota,
        });
    }
    Ok(())
}

/// `SQLite`-backed key-value store.
#[derive(Debug)]
pub struct SqliteStore {
    /// Path to the database file.
    path: PathBuf,
    /// Database connection.
    conn: Connection,
    /// Byte quota, 0 for unlimited.
    quota: usize,
}

impl SqliteStore {
    /// Open or create a store database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist.
    /// Initializes the schema if this is a new database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or schema initialization fails.
    pub fn open(path: impl AsRef<Path>, quota: usize) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        debug!("Opening database at {}", path.display());
        let conn = Connection::open(&path).map_err(|source| Error::DatabaseOpen {
            path: path.clone(),
            source,
        })?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;

        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self { path, conn, quota })
    }

    /// Create an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the in-memory database cannot be created.
    pub fn open_in_memory(quota: usize) -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|source| Error::DatabaseOpen {
            path: PathBuf::from(":memory:"),
            source,
        })?;

        migrations::initialize_schema(&conn)?;

        Ok(Self {
            path: PathBuf::from(":memory:"),
            conn,
            quota,
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// When `key` was last written, as an RFC 3339 string.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn updated_at(&self, key: &str) -> Result<Option<String>> {
        let result = self
            .conn
            .query_row("SELECT updated_at FROM kv WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(result)
    }

    /// Get store statistics.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StoreStats> {
        let keys = self.keys()?.len();
        let total_bytes = self.total_size()?;

        let db_size_bytes = if self.path.to_string_lossy() == ":memory:" {
            0
        } else {
            std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
        };

        Ok(StoreStats {
            keys,
            total_bytes,
            quota_bytes: self.quota,
            db_size_bytes,
        })
    }

    fn entry_size(&self, key: &str) -> Result<Option<usize>> {
        let size: Option<i64> = self
            .conn
            .query_row(
                "SELECT LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB)) FROM kv WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(size.map(|s| usize::try_from(s).unwrap_or(0)))
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        check_quota(
            key,
            value,
            self.total_size()?,
            self.entry_size(key)?,
            self.quota,
        )?;

        self.conn.execute(
            r"
            INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            ",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        debug!(key, bytes = value.len(), "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool> {
        let affected = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(affected > 0)
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT key FROM kv ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(keys)
    }

    fn total_size(&self) -> Result<usize> {
        let total: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0) FROM kv",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(total).unwrap_or(0))
    }

    fn quota(&self) -> usize {
        self.quota
    }
}

/// Statistics about the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Number of keys stored.
    pub keys: usize,
    /// Sum of key and value lengths in bytes.
    pub total_bytes: usize,
    /// Configured quota in bytes, 0 for unlimited.
    pub quota_bytes: usize,
    /// Size of the database file in bytes.
    pub db_size_bytes: u64,
}
