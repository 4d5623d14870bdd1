//! Persistence of the bloom filter and the full-hash index.
//!
//! A run with base path `B` writes three files:
//!
//! * `B.bloom`: the filter snapshot (see [`filter`] for the layout)
//! * `B.bloom.meta`: the filter's `m` and `k`
//! * `B.db`: an SQLite table of full hash to file record (see [`database`])
//!
//! An existing file at any target is first renamed to
//! `<target>.<unix-timestamp>.bak`, with a numeric suffix before `.bak` when
//! that name is taken. A failed rename aborts the call so an earlier snapshot
//! is never overwritten.
//!
//! # Example
//!
//! ```no_run
//! use bloomdupe::duplicates::{BloomConfig, BloomFilter};
//! use bloomdupe::persist::{persist, recover};
//! use std::path::Path;
//!
//! let filter = BloomFilter::with_capacity(10, &BloomConfig::default());
//! let written = persist(Path::new("filter"), Some(&filter), &[]).unwrap();
//!
//! let restored = recover(&written.filter, 10, &BloomConfig::default()).unwrap();
//! assert_eq!(restored.as_bytes(), filter.as_bytes());
//! ```

pub mod database;
pub mod filter;

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

pub use database::{HashIndex, IndexRecord};
pub use filter::{read_filter, read_sizing, recover, sizing_path, write_filter, FilterSizing};

use crate::duplicates::BloomFilter;
use crate::scanner::FileRecord;

/// Extension of the filter snapshot.
pub const FILTER_EXTENSION: &str = "bloom";
/// Extension of the hash index database.
pub const INDEX_EXTENSION: &str = "db";

/// Errors that can occur while persisting or recovering.
#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    /// No base path was given.
    #[error("Persistence base path is empty")]
    EmptyPath,

    /// Nothing to persist: the filter was never built.
    #[error("No bloom filter to persist")]
    NoFilter,

    /// An existing file could not be moved out of the way.
    #[error("{from} > {to} (rename failed): {source}")]
    Rename {
        /// Existing file
        from: PathBuf,
        /// Intended backup name
        to: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Reading or writing a snapshot failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// File being accessed
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The snapshot was written for a different candidate count.
    #[error(
        "{path} holds a {found}-byte filter, current candidates need {expected} bytes"
    )]
    FilterMismatch {
        /// Snapshot file
        path: PathBuf,
        /// Byte length of the freshly sized filter
        expected: usize,
        /// Byte length stored in the header
        found: u64,
    },

    /// The snapshot was written with a different bit or probe count.
    #[error("{path} was written with {found}, current settings give {expected}")]
    SizingMismatch {
        /// Snapshot file
        path: PathBuf,
        /// Sizing of the freshly built filter
        expected: FilterSizing,
        /// Sizing stored next to the snapshot
        found: FilterSizing,
    },

    /// The snapshot ends before its header says it should.
    #[error("{path} is truncated: expected {expected} bytes, found {found}")]
    Truncated {
        /// Snapshot file
        path: PathBuf,
        /// Bytes the header promises (plus the header itself)
        expected: u64,
        /// Bytes actually present
        found: u64,
    },

    /// The hash index database reported an error.
    #[error("Hash index error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A record could not be encoded or decoded.
    #[error("Hash index record error: {0}")]
    Record(#[from] serde_json::Error),
}

/// Files produced by [`persist`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedPaths {
    /// Filter snapshot
    pub filter: PathBuf,
    /// Hash index database
    pub index: PathBuf,
    /// Rows written to the hash index
    pub rows: usize,
    /// Previous files that were rotated away
    pub backups: Vec<PathBuf>,
}

/// `<base>.<extension>`, appended rather than replacing any extension of `base`.
#[must_use]
pub fn target_path(base: &Path, extension: &str) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(".");
    name.push(extension);
    PathBuf::from(name)
}

/// Rename an existing `target` to `<target>.<unix-timestamp>.bak`.
///
/// When that name is taken, `<target>.<unix-timestamp>.<n>.bak` is used with
/// the first free `n`, so earlier backups are kept.
///
/// Returns the backup path, or `None` if there was nothing to move.
///
/// # Errors
///
/// Returns [`PersistError::Rename`] if the rename fails.
pub fn rotate(target: &Path) -> Result<Option<PathBuf>, PersistError> {
    if fs::symlink_metadata(target).is_err() {
        return Ok(None);
    }

    let stamp = chrono::Utc::now().timestamp();
    let mut attempt = 0u32;
    let mut backup = backup_path(target, stamp, attempt);
    while fs::symlink_metadata(&backup).is_ok() {
        attempt += 1;
        backup = backup_path(target, stamp, attempt);
    }

    fs::rename(target, &backup).map_err(|source| PersistError::Rename {
        from: target.to_path_buf(),
        to: backup.clone(),
        source,
    })?;
    log::info!("Rotated {} to {}", target.display(), backup.display());
    Ok(Some(backup))
}

fn backup_path(target: &Path, stamp: i64, attempt: u32) -> PathBuf {
    let mut name = OsString::from(target.as_os_str());
    if attempt == 0 {
        name.push(format!(".{stamp}.bak"));
    } else {
        name.push(format!(".{stamp}.{attempt}.bak"));
    }
    PathBuf::from(name)
}

/// Write the filter snapshot and the hash index next to `base`.
///
/// The index holds one row per candidate with a full digest.
///
/// # Errors
///
/// * [`PersistError::EmptyPath`] / [`PersistError::NoFilter`] when the
///   preconditions fail; nothing is touched on disk.
/// * [`PersistError::Rename`] when an existing file cannot be rotated.
/// * I/O and database errors while writing.
pub fn persist(
    base: &Path,
    filter: Option<&BloomFilter>,
    candidates: &[FileRecord],
) -> Result<PersistedPaths, PersistError> {
    if base.as_os_str().is_empty() {
        return Err(PersistError::EmptyPath);
    }
    let filter = filter.ok_or(PersistError::NoFilter)?;

    let filter_path = target_path(base, FILTER_EXTENSION);
    let index_path = target_path(base, INDEX_EXTENSION);

    let mut backups = Vec::new();
    backups.extend(rotate(&filter_path)?);
    backups.extend(rotate(&sizing_path(&filter_path))?);
    backups.extend(rotate(&index_path)?);

    write_filter(&filter_path, filter)?;

    let mut index = HashIndex::create(&index_path)?;
    let rows = index.insert_candidates(candidates)?;

    log::info!(
        "Persisted filter to {} and {} index rows to {}",
        filter_path.display(),
        rows,
        index_path.display()
    );

    Ok(PersistedPaths {
        filter: filter_path,
        index: index_path,
        rows,
        backups,
    })
}
