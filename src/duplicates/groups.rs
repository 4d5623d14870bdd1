//! Duplicate groups built from the full-hash index.
//!
//! # Overview
//!
//! A bucket of the [`DuplicateIndex`] becomes a [`DuplicateGroup`] once it
//! has two or more members. One copy in each group is the original; every
//! other copy counts as wasted space.
//!
//! # Example
//!
//! ```
//! use bloomdupe::duplicates::DuplicateGroup;
//! use std::path::PathBuf;
//!
//! let group = DuplicateGroup::new(
//!     [0u8; 32],
//!     100,
//!     vec![PathBuf::from("/a"), PathBuf::from("/b"), PathBuf::from("/c")],
//! );
//! assert_eq!(group.wasted_space(), 200);
//! assert_eq!(group.duplicate_count(), 2);
//! ```

use std::path::PathBuf;

use super::DuplicateIndex;
use crate::scanner::{hex_to_hash, FileRecord, Hash};

/// Confirmed duplicate group of files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuplicateGroup {
    /// BLAKE3 hash of the file content
    pub hash: Hash,
    /// File size in bytes, shared by every member
    pub size: u64,
    /// Member paths in discovery order
    pub files: Vec<PathBuf>,
}

impl DuplicateGroup {
    /// Create a new duplicate group.
    ///
    /// # Arguments
    ///
    /// * `hash` - BLAKE3 content hash
    /// * `size` - File size in bytes
    /// * `files` - Member paths
    #[must_use]
    pub fn new(hash: Hash, size: u64, files: Vec<PathBuf>) -> Self {
        Self { hash, size, files }
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.size * self.files.len() as u64
    }

    /// Total wasted space (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size * self.duplicate_count() as u64
    }

    /// Number of duplicate copies (total - 1 original).
    #[must_use]
    pub fn duplicate_count(&self) -> usize {
        self.files.len().saturating_sub(1)
    }

    /// Hash as hexadecimal string.
    #[must_use]
    pub fn hash_hex(&self) -> String {
        crate::scanner::hash_to_hex(&self.hash)
    }
}

/// Totals across a set of duplicate groups.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupTotals {
    /// Number of groups
    pub groups: usize,
    /// Files across all groups, originals included
    pub files: usize,
    /// Sum of every group's wasted space
    pub wasted_bytes: u64,
}

impl GroupTotals {
    /// Sum the totals of `groups`.
    #[must_use]
    pub fn of(groups: &[DuplicateGroup]) -> Self {
        groups.iter().fold(Self::default(), |mut acc, group| {
            acc.groups += 1;
            acc.files += group.len();
            acc.wasted_bytes += group.wasted_space();
            acc
        })
    }
}

/// Materialize every bucket with two or more members.
///
/// Indices in `index` refer to positions in `candidates`. Groups are ordered
/// by wasted space, largest first, with the hash as tie-break.
#[must_use]
pub fn collect_groups(index: &DuplicateIndex, candidates: &[FileRecord]) -> Vec<DuplicateGroup> {
    let mut groups: Vec<DuplicateGroup> = index
        .duplicate_buckets()
        .filter_map(|(hex, members)| {
            let hash = hex_to_hash(hex)?;
            let records: Vec<&FileRecord> =
                members.iter().filter_map(|&i| candidates.get(i)).collect();
            let size = records.first().and_then(|r| r.size()).unwrap_or(0);
            let files = records.iter().map(|r| r.path.clone()).collect();
            Some(DuplicateGroup::new(hash, size, files))
        })
        .filter(|group| group.len() >= 2)
        .collect();

    groups.sort_by(|a, b| {
        b.wasted_space()
            .cmp(&a.wasted_space())
            .then_with(|| a.hash.cmp(&b.hash))
    });
    groups
}
