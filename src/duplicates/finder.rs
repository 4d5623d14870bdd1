//! Candidate filtering through the bloom filter and the two-tier hashes.
//!
//! # Overview
//!
//! Every candidate goes through [`DuplicateFinder::process`] once, in
//! discovery order:
//!
//! 1. **Shallow hash**: digest the prefix of the candidate.
//! 2. **Bloom query**: an unseen shallow digest is inserted into the filter
//!    and remembered as the first holder of that digest. Nothing else is read.
//! 3. **Full hash**: a filter hit costs a full digest of the candidate.
//!    - No earlier holder of the shallow digest means the filter gave a false
//!      positive; the candidate becomes the holder.
//!    - Otherwise the earlier holder is fully hashed too (memoized) and both
//!      records are archived under their own full digests.
//!
//! Full-file reads are therefore limited to files whose prefix collides with
//! an earlier file's prefix, plus the filter's false positives.
//!
//! # Example
//!
//! ```no_run
//! use bloomdupe::duplicates::{collect_groups, BloomConfig, BloomFilter, DuplicateFinder};
//! use bloomdupe::scanner::{Hasher, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let mut walker = Walker::new(WalkerConfig::default());
//! walker.record(Path::new(".")).unwrap();
//! walker.expand().unwrap();
//! let mut outcome = walker.finish();
//!
//! let filter = BloomFilter::with_capacity(outcome.candidates.len(), &BloomConfig::default());
//! let mut finder = DuplicateFinder::new(Hasher::new(), filter);
//! finder.run(&mut outcome.candidates);
//!
//! for group in collect_groups(finder.index(), &outcome.candidates) {
//!     println!("{} copies of {}", group.len(), group.hash_hex());
//! }
//! ```

use std::rc::Rc;

use super::{BloomFilter, DuplicateIndex};
use crate::progress::{ProgressCallback, PHASE_FILTER};
use crate::scanner::{hash_to_hex, FileRecord, Hash, Hasher};

/// What happened to one candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// A digest could not be computed; the candidate stays unmatched.
    HashFailed,
    /// First time this shallow digest was seen.
    Unique,
    /// The filter matched but no earlier record holds this shallow digest.
    FalsePositive,
    /// Archived together with the earlier holder of its shallow digest.
    Archived {
        /// Position of the earlier holder
        prior: usize,
    },
}

/// Counters from the filtering pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Candidates passed to [`DuplicateFinder::process`]
    pub processed: usize,
    /// Shallow digests computed (memoized ones not counted)
    pub shallow_hashed: usize,
    /// Full digests computed (memoized ones not counted)
    pub full_hashed: usize,
    /// Filter queries that answered "maybe present"
    pub bloom_hits: usize,
    /// Filter hits with no earlier record for the shallow digest
    pub false_positives: usize,
    /// Candidates or earlier holders whose digest failed
    pub hash_failures: usize,
}

/// Streams candidates through the filter and the duplicate index.
pub struct DuplicateFinder {
    hasher: Hasher,
    filter: BloomFilter,
    index: DuplicateIndex,
    stats: FilterStats,
    progress_callback: Option<Rc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for DuplicateFinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuplicateFinder")
            .field("hasher", &self.hasher)
            .field("bit_count", &self.filter.bit_count())
            .field("hash_count", &self.filter.hash_count())
            .field("buckets", &self.index.bucket_count())
            .field("stats", &self.stats)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl DuplicateFinder {
    /// Create a finder around an already sized filter.
    #[must_use]
    pub fn new(hasher: Hasher, filter: BloomFilter) -> Self {
        Self {
            hasher,
            filter,
            index: DuplicateIndex::new(),
            stats: FilterStats::default(),
            progress_callback: None,
        }
    }

    /// Set the progress callback for [`DuplicateFinder::run`].
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Rc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// Process every candidate in order.
    pub fn run(&mut self, candidates: &mut [FileRecord]) {
        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_start(PHASE_FILTER, candidates.len());
        }

        for position in 0..candidates.len() {
            self.process(candidates, position);
            if let Some(ref callback) = self.progress_callback {
                callback.on_progress(position + 1, &candidates[position].path.to_string_lossy());
            }
        }

        if let Some(ref callback) = self.progress_callback {
            callback.on_phase_end(PHASE_FILTER);
        }
        log::debug!("Filtering done: {:?}", self.stats);
    }

    /// Process the candidate at `position`.
    ///
    /// # Panics
    ///
    /// Panics if `position` is out of bounds for `candidates`.
    pub fn process(&mut self, candidates: &mut [FileRecord], position: usize) -> ProcessOutcome {
        self.stats.processed += 1;

        let Some(shallow) = self.shallow(&mut candidates[position]) else {
            return ProcessOutcome::HashFailed;
        };
        let key = hash_to_hex(&shallow);
        log::trace!("[SHASH] {}\t*{}", candidates[position].path.display(), key);

        if !self.filter.query(&key) {
            self.filter.insert(&key);
            self.index.record_shallow(key, position);
            return ProcessOutcome::Unique;
        }
        self.stats.bloom_hits += 1;

        let Some(full) = self.full(&mut candidates[position]) else {
            return ProcessOutcome::HashFailed;
        };

        let Some(prior) = self.index.lookup_shallow(&key) else {
            log::debug!(
                "'{}' (false positive)",
                candidates[position].path.display()
            );
            self.stats.false_positives += 1;
            self.index.record_shallow(key, position);
            return ProcessOutcome::FalsePositive;
        };

        let prior_full = self.full(&mut candidates[prior]);
        self.index.archive(&hash_to_hex(&full), position);
        if let Some(prior_full) = prior_full {
            self.index.archive(&hash_to_hex(&prior_full), prior);
        }
        ProcessOutcome::Archived { prior }
    }

    fn shallow(&mut self, record: &mut FileRecord) -> Option<Hash> {
        let fresh = record.shallow_hash.is_none();
        let hash = self.hasher.shallow_digest(record);
        match hash {
            Some(_) if fresh => self.stats.shallow_hashed += 1,
            Some(_) => {}
            None => self.stats.hash_failures += 1,
        }
        hash
    }

    fn full(&mut self, record: &mut FileRecord) -> Option<Hash> {
        let fresh = record.full_hash.is_none();
        let hash = self.hasher.full_digest(record);
        match hash {
            Some(hash) if fresh => {
                self.stats.full_hashed += 1;
                log::trace!("[+HASH] {}\t*{}", record.path.display(), hash_to_hex(&hash));
            }
            Some(_) => {}
            None => self.stats.hash_failures += 1,
        }
        hash
    }

    /// The filter in its current state.
    #[must_use]
    pub fn filter(&self) -> &BloomFilter {
        &self.filter
    }

    /// The duplicate index in its current state.
    #[must_use]
    pub fn index(&self) -> &DuplicateIndex {
        &self.index
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> FilterStats {
        self.stats
    }

    /// Hand over the filter, index and counters.
    #[must_use]
    pub fn into_parts(self) -> (BloomFilter, DuplicateIndex, FilterStats) {
        (self.filter, self.index, self.stats)
    }
}
