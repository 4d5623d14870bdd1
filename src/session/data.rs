//! Statistics and results of a session.

use serde::Serialize;

use crate::duplicates::{DuplicateGroup, FilterStats, GroupTotals};
use crate::persist::PersistedPaths;
use crate::scanner::WalkOutcome;

/// Counters gathered across every phase of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Regular files plus rejected entries
    pub total_files: usize,
    /// Regular files eligible for hashing
    pub candidates: usize,
    /// Combined size of all candidates
    pub candidate_bytes: u64,
    /// Rejected entries of any kind
    pub ignored: usize,
    /// Paths that could not be stat'ed
    pub invalid: usize,
    /// Paths without read permission
    pub inaccessible: usize,
    /// Symlinks and special files
    pub irregular: usize,
    /// Children skipped by the path length guard
    pub skipped_long_paths: usize,
    /// Bloom filter size in bits
    pub filter_bits: usize,
    /// Probes per key
    pub filter_hashes: u32,
    /// Shallow digests computed
    pub shallow_hashed: usize,
    /// Full digests computed
    pub full_hashed: usize,
    /// Filter queries answering "maybe present"
    pub bloom_hits: usize,
    /// Filter hits with no earlier holder of the shallow digest
    pub false_positives: usize,
    /// Digests that could not be computed
    pub hash_failures: usize,
    /// Groups of two or more identical files
    pub duplicate_groups: usize,
    /// Files in those groups, originals included
    pub files_in_groups: usize,
    /// Files in those groups beyond the first copy
    pub duplicate_files: usize,
    /// Bytes held by the extra copies
    pub wasted_bytes: u64,
}

impl SessionStats {
    /// Fill in the walk counters.
    pub fn record_walk(&mut self, outcome: &WalkOutcome) {
        self.total_files = outcome.total_files;
        self.candidates = outcome.candidates.len();
        self.candidate_bytes = outcome.candidates.iter().filter_map(|r| r.size()).sum();
        self.ignored = outcome.ignored();
        self.invalid = outcome.counts.invalid;
        self.inaccessible = outcome.counts.inaccessible;
        self.irregular = outcome.counts.irregular;
        self.skipped_long_paths = outcome.skipped_long_paths;
    }

    /// Fill in the filtering counters.
    pub fn record_filtering(&mut self, stats: &FilterStats) {
        self.shallow_hashed = stats.shallow_hashed;
        self.full_hashed = stats.full_hashed;
        self.bloom_hits = stats.bloom_hits;
        self.false_positives = stats.false_positives;
        self.hash_failures = stats.hash_failures;
    }

    /// Fill in the group totals.
    pub fn record_groups(&mut self, groups: &[DuplicateGroup]) {
        let totals = GroupTotals::of(groups);
        self.duplicate_groups = totals.groups;
        self.files_in_groups = totals.files;
        self.duplicate_files = groups.iter().map(DuplicateGroup::duplicate_count).sum();
        self.wasted_bytes = totals.wasted_bytes;
    }

    /// Share of candidates that needed a full read, in percent.
    #[must_use]
    pub fn full_hash_rate(&self) -> f64 {
        if self.candidates == 0 {
            0.0
        } else {
            (self.full_hashed as f64 / self.candidates as f64) * 100.0
        }
    }

    /// Share of candidate bytes held by extra copies, in percent.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.candidate_bytes == 0 {
            0.0
        } else {
            (self.wasted_bytes as f64 / self.candidate_bytes as f64) * 100.0
        }
    }

    /// One-line digest of the run for the debug log.
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{} candidates, {:.1}% fully hashed, {} false positives, {} groups, {:.1}% of candidate bytes wasted",
            self.candidates,
            self.full_hash_rate(),
            self.false_positives,
            self.duplicate_groups,
            self.wasted_percentage()
        )
    }
}

/// Everything a finished session hands to the report.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Duplicate groups, largest waste first
    pub groups: Vec<DuplicateGroup>,
    /// Counters from every phase
    pub stats: SessionStats,
    /// Files written by persistence, if it ran
    pub persisted: Option<PersistedPaths>,
}
