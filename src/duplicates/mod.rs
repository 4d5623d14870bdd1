//! Duplicate detection module.
//!
//! This module provides functionality for:
//! - Sizing and querying the shallow-digest bloom filter
//! - Tracking first-seen shallow digests and full-hash buckets
//! - Streaming candidates through both (see [`finder`])
//! - Turning buckets into duplicate groups with wasted-space totals

pub mod bloom;
pub mod finder;
pub mod groups;
pub mod index;

pub use bloom::{BloomConfig, BloomError, BloomFilter, DEFAULT_FALSE_POSITIVE_RATE};
pub use finder::{DuplicateFinder, FilterStats, ProcessOutcome};
pub use groups::{collect_groups, DuplicateGroup, GroupTotals};
pub use index::DuplicateIndex;
