//! Duplicate index: full-hash buckets plus the first-seen shallow map.
//!
//! The index never owns records. Both maps hold positions in the candidate
//! list, so a record stays owned by that list while it is indexed.

use std::collections::{BTreeSet, HashMap};

/// Full-hash and shallow-hash lookup tables over candidate positions.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    shallow: HashMap<String, usize>,
    full: HashMap<String, BTreeSet<usize>>,
}

impl DuplicateIndex {
    /// Create an empty index.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// First candidate recorded under `shallow_hex`, if any.
    #[must_use]
    pub fn lookup_shallow(&self, shallow_hex: &str) -> Option<usize> {
        self.shallow.get(shallow_hex).copied()
    }

    /// Record `candidate` as the holder of `shallow_hex`.
    ///
    /// Only called when no holder exists yet; an existing entry is kept.
    pub fn record_shallow(&mut self, shallow_hex: String, candidate: usize) {
        self.shallow.entry(shallow_hex).or_insert(candidate);
    }

    /// Add `candidate` to the bucket for `full_hex`, creating it if absent.
    ///
    /// Returns `false` if the candidate was already in the bucket.
    pub fn archive(&mut self, full_hex: &str, candidate: usize) -> bool {
        let inserted = self
            .full
            .entry(full_hex.to_string())
            .or_default()
            .insert(candidate);
        if !inserted {
            log::debug!("candidate #{candidate} (extra file)");
        }
        inserted
    }

    /// Members of the bucket for `full_hex`.
    #[must_use]
    pub fn bucket(&self, full_hex: &str) -> Option<&BTreeSet<usize>> {
        self.full.get(full_hex)
    }

    /// All buckets, including single-member ones.
    pub fn buckets(&self) -> impl Iterator<Item = (&str, &BTreeSet<usize>)> {
        self.full.iter().map(|(hash, set)| (hash.as_str(), set))
    }

    /// Buckets with two or more members.
    pub fn duplicate_buckets(&self) -> impl Iterator<Item = (&str, &BTreeSet<usize>)> {
        self.buckets().filter(|(_, set)| set.len() >= 2)
    }

    /// Number of full-hash buckets.
    #[must_use]
    pub fn bucket_count(&self) -> usize {
        self.full.len()
    }

    /// Number of distinct shallow digests recorded.
    #[must_use]
    pub fn shallow_count(&self) -> usize {
        self.shallow.len()
    }
}
