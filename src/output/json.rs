//! JSON report for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "duplicates": [
//!     {
//!       "hash": "af1349b9...",
//!       "size": 1024,
//!       "files": ["/data/a.bin", "/data/b.bin"]
//!     }
//!   ],
//!   "stats": { "total_files": 100, "candidates": 98, "wasted_bytes": 1024, ... },
//!   "persisted": { "filter": "filter.bloom", "index": "filter.db", "rows": 2 },
//!   "exit_code": 0,
//!   "exit_code_name": "BD000"
//! }
//! ```
//!
//! # Example
//!
//! ```
//! use bloomdupe::error::ExitCode;
//! use bloomdupe::output::json::JsonOutput;
//! use bloomdupe::session::{SessionReport, SessionStats};
//!
//! let report = SessionReport {
//!     groups: Vec::new(),
//!     stats: SessionStats::default(),
//!     persisted: None,
//! };
//! let output = JsonOutput::new(&report, ExitCode::Success);
//! assert!(output.to_json().unwrap().starts_with('{'));
//! ```

use std::io::Write;

use serde::Serialize;

use crate::duplicates::DuplicateGroup;
use crate::error::ExitCode;
use crate::persist::PersistedPaths;
use crate::session::{SessionReport, SessionStats};

/// A single duplicate group in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonDuplicateGroup {
    /// BLAKE3 hash as hexadecimal string (64 characters)
    pub hash: String,
    /// Size of each file in bytes
    pub size: u64,
    /// Bytes held by the extra copies
    pub wasted: u64,
    /// Member paths in discovery order
    pub files: Vec<String>,
}

impl From<&DuplicateGroup> for JsonDuplicateGroup {
    fn from(group: &DuplicateGroup) -> Self {
        Self {
            hash: group.hash_hex(),
            size: group.size,
            wasted: group.wasted_space(),
            files: group
                .files
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Persisted file locations in JSON format.
#[derive(Debug, Clone, Serialize)]
pub struct JsonPersisted {
    /// Filter snapshot path
    pub filter: String,
    /// Hash index path
    pub index: String,
    /// Rows written to the index
    pub rows: usize,
    /// Rotated previous files
    pub backups: Vec<String>,
}

impl From<&PersistedPaths> for JsonPersisted {
    fn from(paths: &PersistedPaths) -> Self {
        Self {
            filter: paths.filter.to_string_lossy().into_owned(),
            index: paths.index.to_string_lossy().into_owned(),
            rows: paths.rows,
            backups: paths
                .backups
                .iter()
                .map(|p| p.to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Complete JSON output structure.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Duplicate groups, largest waste first
    pub duplicates: Vec<JsonDuplicateGroup>,
    /// Session counters
    pub stats: SessionStats,
    /// Persisted files, if persistence ran
    pub persisted: Option<JsonPersisted>,
    /// Process exit code
    pub exit_code: i32,
    /// Machine-readable exit code name (e.g. "BD000")
    pub exit_code_name: String,
}

impl JsonOutput {
    /// Build the JSON view of `report`.
    #[must_use]
    pub fn new(report: &SessionReport, exit_code: ExitCode) -> Self {
        Self {
            duplicates: report.groups.iter().map(JsonDuplicateGroup::from).collect(),
            stats: report.stats,
            persisted: report.persisted.as_ref().map(JsonPersisted::from),
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }

    /// Serialize to compact JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write JSON followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}
