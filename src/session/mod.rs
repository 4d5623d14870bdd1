//! Scan session: owns every collection and drives the phases in order.
//!
//! # Overview
//!
//! A [`Session`] runs:
//!
//! 1. **Scan**: seed the walker with the user paths, expand every directory,
//!    warn about each ignored entry and, in strict mode, stop there.
//! 2. **Filter**: size the bloom filter from the final candidate count (or
//!    recover a snapshot sized for the same count) and stream every
//!    candidate through the [`DuplicateFinder`].
//! 3. **Persist**: write `<base>.bloom` and `<base>.db` unless disabled.
//! 4. **Report**: collect duplicate groups and totals.
//!
//! Nothing is shared: the candidate list owns the records, the index refers
//! to them by position.
//!
//! # Example
//!
//! ```no_run
//! use bloomdupe::config::Config;
//! use bloomdupe::session::Session;
//! use std::path::PathBuf;
//!
//! let config = Config {
//!     index_base: String::new(),
//!     ..Config::default()
//! };
//! let mut session = Session::new(config);
//! let report = session.run(&[PathBuf::from(".")], None).unwrap();
//! println!("{} bytes wasted", report.stats.wasted_bytes);
//! ```

pub mod data;

use std::path::{Path, PathBuf};
use std::rc::Rc;

pub use data::{SessionReport, SessionStats};

use crate::config::Config;
use crate::duplicates::{collect_groups, BloomFilter, DuplicateFinder, DuplicateGroup, DuplicateIndex};
use crate::persist::{self, PersistError, PersistedPaths};
use crate::progress::{ProgressCallback, PHASE_WALK};
use crate::scanner::{ContentSource, FileRecord, Hasher, ScanError, WalkOutcome, Walker};

/// Errors that end a session.
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    /// No paths were given.
    #[error("No paths to scan")]
    NoPaths,

    /// Traversal ran out of memory.
    #[error("Cannot parse entire file tree: {0}")]
    Scan(#[from] ScanError),

    /// Strict mode and at least one entry was ignored.
    #[error("{ignored} file(s) ignored in strict mode")]
    Strict {
        /// Number of ignored entries
        ignored: usize,
    },

    /// Recovering or writing the filter and index failed.
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// State of one duplicate scan.
pub struct Session {
    config: Config,
    hasher: Hasher,
    outcome: WalkOutcome,
    filter: Option<BloomFilter>,
    index: DuplicateIndex,
    stats: SessionStats,
    progress_callback: Option<Rc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("hasher", &self.hasher)
            .field("candidates", &self.outcome.candidates.len())
            .field("rejected", &self.outcome.rejected.len())
            .field("filter_bits", &self.filter.as_ref().map(BloomFilter::bit_count))
            .field("stats", &self.stats)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Session {
    /// Create a session reading files from disk.
    #[must_use]
    pub fn new(config: Config) -> Self {
        let hasher = Hasher::new().with_shallow_len(config.shallow_len);
        Self {
            config,
            hasher,
            outcome: WalkOutcome::default(),
            filter: None,
            index: DuplicateIndex::new(),
            stats: SessionStats::default(),
            progress_callback: None,
        }
    }

    /// Read file contents through `source` instead of the filesystem.
    #[must_use]
    pub fn with_content_source(mut self, source: Rc<dyn ContentSource>) -> Self {
        self.hasher = Hasher::with_source(source).with_shallow_len(self.config.shallow_len);
        self
    }

    /// Set the progress callback for the walk and filter phases.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Rc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Walk `paths` and classify everything reachable.
    ///
    /// Ignored entries are logged one by one, then as a total.
    ///
    /// # Errors
    ///
    /// * [`SessionError::Scan`] if traversal runs out of memory.
    /// * [`SessionError::Strict`] in strict mode when anything was ignored.
    pub fn scan(&mut self, paths: &[PathBuf]) -> Result<(), SessionError> {
        let mut walker = Walker::new(self.config.walker_config());
        if let Some(ref callback) = self.progress_callback {
            walker = walker.with_progress_callback(Rc::clone(callback));
            callback.on_phase_start(PHASE_WALK, 0);
        }

        let walked = paths
            .iter()
            .try_for_each(|path| walker.record(path))
            .and_then(|()| walker.expand());

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_WALK);
        }
        walked?;

        self.outcome = walker.finish();
        self.stats.record_walk(&self.outcome);
        self.report_ignored();

        log::debug!(
            "Found {} / {} valid files",
            self.outcome.valid_files(),
            self.outcome.total_files
        );

        if self.config.strict && self.outcome.ignored() > 0 {
            return Err(SessionError::Strict {
                ignored: self.outcome.ignored(),
            });
        }
        Ok(())
    }

    fn report_ignored(&self) {
        for record in &self.outcome.rejected {
            log::warn!("'{}' ({})", record.path.display(), record.kind);
        }
        if self.outcome.ignored() > 0 {
            log::warn!("{} file(s) ignored", self.outcome.ignored());
        }
    }

    /// Size the filter from the current candidate count.
    ///
    /// With `recover_from`, the snapshot at that path is loaded into it.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persist`] if the snapshot cannot be read or
    /// was written for a different candidate count.
    pub fn build_filter(&mut self, recover_from: Option<&Path>) -> Result<(), SessionError> {
        let n = self.outcome.candidates.len();
        let bloom = self.config.bloom_config();

        let filter = match recover_from {
            Some(path) => persist::recover(path, n, &bloom)?,
            None => BloomFilter::with_capacity(n, &bloom),
        };

        self.stats.filter_bits = filter.bit_count();
        self.stats.filter_hashes = filter.hash_count();
        self.filter = Some(filter);
        Ok(())
    }

    /// Stream every candidate through the filter and the index.
    ///
    /// Builds an empty filter first if [`Session::build_filter`] was not called.
    pub fn filter_candidates(&mut self) {
        let filter = match self.filter.take() {
            Some(filter) => filter,
            None => {
                let filter = BloomFilter::with_capacity(
                    self.outcome.candidates.len(),
                    &self.config.bloom_config(),
                );
                self.stats.filter_bits = filter.bit_count();
                self.stats.filter_hashes = filter.hash_count();
                filter
            }
        };

        let mut finder = DuplicateFinder::new(self.hasher.clone(), filter);
        if let Some(ref callback) = self.progress_callback {
            finder = finder.with_progress_callback(Rc::clone(callback));
        }
        finder.run(&mut self.outcome.candidates);

        let (filter, index, stats) = finder.into_parts();
        self.filter = Some(filter);
        self.index = index;
        self.stats.record_filtering(&stats);
    }

    /// Write the filter snapshot and hash index, if persistence is enabled.
    ///
    /// Returns `None` when `index_base` is empty.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Persist`] on any persistence failure,
    /// including a missing filter.
    pub fn persist(&self) -> Result<Option<PersistedPaths>, SessionError> {
        let Some(base) = self.config.index_base_path() else {
            log::debug!("Persistence disabled");
            return Ok(None);
        };
        let written = persist::persist(&base, self.filter.as_ref(), &self.outcome.candidates)?;
        Ok(Some(written))
    }

    /// Current duplicate groups.
    #[must_use]
    pub fn groups(&self) -> Vec<DuplicateGroup> {
        collect_groups(&self.index, &self.outcome.candidates)
    }

    /// Run every phase over `paths`.
    ///
    /// A scan with no candidates skips filtering and persistence.
    ///
    /// # Errors
    ///
    /// Any [`SessionError`] from the phases; see [`Session::scan`],
    /// [`Session::build_filter`] and [`Session::persist`].
    pub fn run(
        &mut self,
        paths: &[PathBuf],
        recover_from: Option<&Path>,
    ) -> Result<SessionReport, SessionError> {
        if paths.is_empty() {
            return Err(SessionError::NoPaths);
        }

        self.scan(paths)?;

        let mut persisted = None;
        if self.outcome.candidates.is_empty() {
            log::info!("No regular files to hash");
        } else {
            self.build_filter(recover_from)?;
            self.filter_candidates();
            persisted = self.persist()?;
        }

        let groups = self.groups();
        self.stats.record_groups(&groups);
        log::debug!("Session stats: {}", self.stats.summary());

        Ok(SessionReport {
            groups,
            stats: self.stats,
            persisted,
        })
    }

    /// The effective configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Regular files found by the scan.
    #[must_use]
    pub fn candidates(&self) -> &[FileRecord] {
        &self.outcome.candidates
    }

    /// Entries ignored by the scan.
    #[must_use]
    pub fn rejected(&self) -> &[FileRecord] {
        &self.outcome.rejected
    }

    /// The filter, once built.
    #[must_use]
    pub fn filter(&self) -> Option<&BloomFilter> {
        self.filter.as_ref()
    }

    /// The duplicate index.
    #[must_use]
    pub fn index(&self) -> &DuplicateIndex {
        &self.index
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }
}
