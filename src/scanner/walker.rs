//! Directory walker with an explicit pending-directory stack.
//!
//! # Overview
//!
//! The [`Walker`] classifies every path it is given and routes the record
//! into one of three owning collections:
//!
//! - directories go onto a LIFO pending stack,
//! - regular files become candidates,
//! - everything else (invalid, protected, irregular) is rejected.
//!
//! [`Walker::expand`] drains the pending stack depth-first without recursion.
//! Sibling order is whatever the filesystem enumerates. Names starting with
//! `.` are skipped, and a child whose constructed path would reach the
//! maximum path length is skipped silently.
//!
//! # Example
//!
//! ```no_run
//! use bloomdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let mut walker = Walker::new(WalkerConfig::default());
//! walker.record(Path::new("/home/user/Downloads")).unwrap();
//! walker.expand().unwrap();
//!
//! let outcome = walker.finish();
//! println!("{} candidates, {} ignored", outcome.candidates.len(), outcome.ignored());
//! ```

use std::fs;
use std::path::Path;
use std::rc::Rc;

use super::{classify, FileKind, FileRecord, ScanError};
use crate::progress::ProgressCallback;

/// Default bound on constructed child paths, in bytes.
pub const DEFAULT_MAX_PATH_LEN: usize = 0x7FF7;

/// Configuration for directory walking.
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Children whose joined path is at least this many bytes are skipped.
    pub max_path_len: usize,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            max_path_len: DEFAULT_MAX_PATH_LEN,
        }
    }
}

impl WalkerConfig {
    /// Set the maximum constructed path length.
    #[must_use]
    pub fn with_max_path_len(mut self, len: usize) -> Self {
        self.max_path_len = len;
        self
    }
}

/// Per-category counts of rejected records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IgnoredCounts {
    /// Paths that could not be stat'ed
    pub invalid: usize,
    /// Paths without read permission
    pub inaccessible: usize,
    /// Symlinks and special files
    pub irregular: usize,
}

impl IgnoredCounts {
    /// Sum of all categories.
    #[must_use]
    pub fn total(&self) -> usize {
        self.invalid + self.inaccessible + self.irregular
    }
}

/// Everything a finished walk produced.
#[derive(Debug, Default)]
pub struct WalkOutcome {
    /// Regular files in discovery order
    pub candidates: Vec<FileRecord>,
    /// Non-regular, non-directory records in discovery order
    pub rejected: Vec<FileRecord>,
    /// Candidates plus rejected records
    pub total_files: usize,
    /// Rejected records by category
    pub counts: IgnoredCounts,
    /// Children skipped by the path length guard
    pub skipped_long_paths: usize,
}

impl WalkOutcome {
    /// Number of rejected records.
    #[must_use]
    pub fn ignored(&self) -> usize {
        self.counts.total()
    }

    /// Number of usable files.
    #[must_use]
    pub fn valid_files(&self) -> usize {
        self.total_files - self.ignored()
    }
}

/// Depth-first tree walker.
pub struct Walker {
    config: WalkerConfig,
    pending: Vec<FileRecord>,
    outcome: WalkOutcome,
    progress_callback: Option<Rc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("config", &self.config)
            .field("pending", &self.pending.len())
            .field("candidates", &self.outcome.candidates.len())
            .field("rejected", &self.outcome.rejected.len())
            .finish()
    }
}

impl Walker {
    /// Create an empty walker.
    #[must_use]
    pub fn new(config: WalkerConfig) -> Self {
        Self {
            config,
            pending: Vec::new(),
            outcome: WalkOutcome::default(),
            progress_callback: None,
        }
    }

    /// Set the progress callback, notified once per recorded file.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Rc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Classify `path` and route it to the stack, candidates or rejected list.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::OutOfMemory`] if a collection cannot grow. This is
    /// fatal: the caller must abandon the scan.
    pub fn record(&mut self, path: &Path) -> Result<(), ScanError> {
        let record = classify(path);
        match record.kind {
            FileKind::Directory => push_record(&mut self.pending, record)?,
            FileKind::Regular { .. } => {
                push_record(&mut self.outcome.candidates, record)?;
                self.outcome.total_files += 1;
                self.report_progress(path);
            }
            FileKind::Invalid | FileKind::Inaccessible | FileKind::Other => {
                let kind = record.kind;
                push_record(&mut self.outcome.rejected, record)?;
                self.outcome.total_files += 1;
                match kind {
                    FileKind::Invalid => self.outcome.counts.invalid += 1,
                    FileKind::Inaccessible => self.outcome.counts.inaccessible += 1,
                    _ => self.outcome.counts.irregular += 1,
                }
                self.report_progress(path);
            }
        }
        Ok(())
    }

    /// Drain the pending stack until every reachable entry is classified.
    ///
    /// # Errors
    ///
    /// Propagates [`ScanError::OutOfMemory`] from [`Walker::record`].
    pub fn expand(&mut self) -> Result<(), ScanError> {
        while let Some(directory) = self.pending.pop() {
            self.expand_directory(&directory.path)?;
        }
        Ok(())
    }

    fn expand_directory(&mut self, directory: &Path) -> Result<(), ScanError> {
        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("'{}' (cannot open directory: {})", directory.display(), e);
                return Ok(());
            }
        };

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("'{}' (read failed: {})", directory.display(), e);
                    continue;
                }
            };

            let name = entry.file_name();
            if name.as_encoded_bytes().first() == Some(&b'.') {
                continue;
            }

            let child = directory.join(&name);
            if child.as_os_str().len() >= self.config.max_path_len {
                log::trace!("Skipping overlong path under {}", directory.display());
                self.outcome.skipped_long_paths += 1;
                continue;
            }

            self.record(&child)?;
        }
        Ok(())
    }

    /// Number of directories still waiting to be expanded.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Candidates recorded so far.
    #[must_use]
    pub fn candidates(&self) -> &[FileRecord] {
        &self.outcome.candidates
    }

    /// Consume the walker, handing over its collections.
    ///
    /// Directories still on the stack are dropped.
    #[must_use]
    pub fn finish(self) -> WalkOutcome {
        if !self.pending.is_empty() {
            log::debug!("Dropping {} unexpanded directories", self.pending.len());
        }
        self.outcome
    }

    fn report_progress(&self, path: &Path) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_progress(self.outcome.total_files, &path.to_string_lossy());
        }
    }
}

fn push_record(list: &mut Vec<FileRecord>, record: FileRecord) -> Result<(), ScanError> {
    if list.try_reserve(1).is_err() {
        return Err(ScanError::OutOfMemory(record.path));
    }
    list.push(record);
    Ok(())
}
