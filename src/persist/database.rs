//! SQLite-backed hash index.
//!
//! One table maps a full-hash hex key to a JSON-encoded [`IndexRecord`].
//! Keys repeat: every candidate that was fully hashed gets its own row, so
//! a duplicate group shows up as several rows under one key.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OpenFlags};
use serde::{Deserialize, Serialize};

use super::PersistError;
use crate::scanner::FileRecord;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS hash_index (
        id     INTEGER PRIMARY KEY,
        hash   TEXT NOT NULL,
        record TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_hash_index_hash ON hash_index (hash);
";

/// File data stored under a full hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Path of the file when it was hashed
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
    /// Shallow digest as hex
    pub shallow_hash: Option<String>,
}

impl IndexRecord {
    /// Build the stored form of `record`, if it has a full digest.
    #[must_use]
    pub fn from_record(record: &FileRecord) -> Option<(String, Self)> {
        let full = record.full_hex()?;
        Some((
            full,
            Self {
                path: record.path.clone(),
                size: record.size().unwrap_or(0),
                shallow_hash: record.shallow_hex(),
            },
        ))
    }
}

/// Persistent full-hash index.
pub struct HashIndex {
    conn: Connection,
}

impl std::fmt::Debug for HashIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashIndex")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl HashIndex {
    /// Create (or extend) the index database at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] if the file cannot be opened or
    /// the schema cannot be created.
    pub fn create(path: &Path) -> Result<Self, PersistError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch(SCHEMA)?;
        log::debug!("Hash index schema ready at {}", path.display());
        Ok(Self { conn })
    }

    /// Open an existing index read-only.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] if the file is missing or is not
    /// an index database.
    pub fn open(path: &Path) -> Result<Self, PersistError> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;
        conn.query_row("SELECT COUNT(*) FROM hash_index", [], |row| {
            row.get::<_, i64>(0)
        })?;
        Ok(Self { conn })
    }

    /// In-memory index, for tests.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] if SQLite fails to initialise.
    pub fn open_in_memory() -> Result<Self, PersistError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Store `record` under `full_hex`.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding or the insert fails.
    pub fn insert(&self, full_hex: &str, record: &IndexRecord) -> Result<(), PersistError> {
        let json = serde_json::to_string(record)?;
        self.conn.execute(
            "INSERT INTO hash_index (hash, record) VALUES (?1, ?2)",
            params![full_hex.to_ascii_lowercase(), json],
        )?;
        Ok(())
    }

    /// Store one row per candidate that has a full digest, in one transaction.
    ///
    /// Returns the number of rows written.
    ///
    /// # Errors
    ///
    /// Returns an error if any insert fails; the transaction is rolled back.
    pub fn insert_candidates(&mut self, candidates: &[FileRecord]) -> Result<usize, PersistError> {
        let tx = self.conn.transaction()?;
        let mut rows = 0;
        {
            let mut stmt = tx.prepare("INSERT INTO hash_index (hash, record) VALUES (?1, ?2)")?;
            for (full, record) in candidates.iter().filter_map(IndexRecord::from_record) {
                let json = serde_json::to_string(&record)?;
                stmt.execute(params![full, json])?;
                rows += 1;
            }
        }
        tx.commit()?;
        Ok(rows)
    }

    /// All records stored under `full_hex`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row cannot be decoded.
    pub fn records_for(&self, full_hex: &str) -> Result<Vec<IndexRecord>, PersistError> {
        let mut stmt = self
            .conn
            .prepare("SELECT record FROM hash_index WHERE hash = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![full_hex.to_ascii_lowercase()], |row| {
            row.get::<_, String>(0)
        })?;

        let mut records = Vec::new();
        for json in rows {
            records.push(serde_json::from_str(&json?)?);
        }
        Ok(records)
    }

    /// Total number of rows.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] if the count query fails.
    pub fn len(&self) -> Result<usize, PersistError> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM hash_index", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Whether the index has no rows.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] if the count query fails.
    pub fn is_empty(&self) -> Result<bool, PersistError> {
        Ok(self.len()? == 0)
    }

    /// Number of distinct full hashes.
    ///
    /// # Errors
    ///
    /// Returns [`PersistError::Database`] if the count query fails.
    pub fn distinct_hashes(&self) -> Result<usize, PersistError> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT hash) FROM hash_index",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}
