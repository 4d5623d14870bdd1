//! Scanner module for path classification, tree walking and content hashing.
//!
//! This module provides functionality for:
//! - Classifying a path into a typed [`FileRecord`]
//! - Depth-first directory expansion with an explicit stack
//! - Shallow (prefix) and full content hashing with BLAKE3
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`entry`]: Non-following stat and classification
//! - [`walker`]: Directory traversal and candidate partitioning
//! - [`hasher`]: Memoized shallow/full digests over a [`ContentSource`]
//!
//! # Example
//!
//! ```no_run
//! use bloomdupe::scanner::{Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let mut walker = Walker::new(WalkerConfig::default());
//! walker.record(Path::new(".")).unwrap();
//! walker.expand().unwrap();
//!
//! let outcome = walker.finish();
//! for record in &outcome.candidates {
//!     println!("{}: {:?} bytes", record.path.display(), record.size());
//! }
//! ```

pub mod entry;
pub mod hasher;
pub mod walker;

use std::fmt;
use std::path::PathBuf;

pub use entry::classify;
pub use hasher::{ContentSource, DiskSource, FileContents, Hasher, DEFAULT_SHALLOW_LEN};
pub use walker::{IgnoredCounts, WalkOutcome, Walker, WalkerConfig, DEFAULT_MAX_PATH_LEN};

/// A BLAKE3 digest.
pub type Hash = [u8; 32];

/// Render a digest as lowercase hexadecimal.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    hash.iter().map(|b| format!("{b:02x}")).collect()
}

/// Parse a 64-character hex string back into a digest.
///
/// Accepts upper or lower case. Returns `None` on bad length or digits.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }
    let mut hash = [0u8; 32];
    for (i, byte) in hash.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(hash)
}

/// Classification of a path, in precedence order.
///
/// Only regular files carry a size; everything else is either walked
/// (directories) or reported as ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// The path could not be stat'ed.
    Invalid,
    /// The path exists but the process cannot read it.
    Inaccessible,
    /// A regular file of `size` bytes.
    Regular {
        /// File size in bytes
        size: u64,
    },
    /// A directory to expand.
    Directory,
    /// Anything else: symlinks, devices, fifos, sockets.
    Other,
}

impl FileKind {
    /// Label used in ignored-file warnings.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Invalid => "invalid file",
            Self::Inaccessible => "protected file",
            Self::Regular { .. } => "regular file",
            Self::Directory => "directory",
            Self::Other => "irregular file",
        }
    }
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A classified path with lazily computed digests.
///
/// A record is owned by exactly one collection at a time: the walker's
/// pending stack, the rejected list or the candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Path as given or as constructed during expansion
    pub path: PathBuf,
    /// Classification result
    pub kind: FileKind,
    /// Digest of the bounded prefix, once computed
    pub shallow_hash: Option<Hash>,
    /// Digest of the whole content, once computed
    pub full_hash: Option<Hash>,
}

impl FileRecord {
    /// Create a record with no digests.
    #[must_use]
    pub fn new(path: PathBuf, kind: FileKind) -> Self {
        Self {
            path,
            kind,
            shallow_hash: None,
            full_hash: None,
        }
    }

    /// Byte size for regular files.
    #[must_use]
    pub fn size(&self) -> Option<u64> {
        match self.kind {
            FileKind::Regular { size } => Some(size),
            _ => None,
        }
    }

    /// Whether this record is a hashing candidate.
    #[must_use]
    pub fn is_regular(&self) -> bool {
        matches!(self.kind, FileKind::Regular { .. })
    }

    /// Shallow digest as hex, if computed.
    #[must_use]
    pub fn shallow_hex(&self) -> Option<String> {
        self.shallow_hash.as_ref().map(hash_to_hex)
    }

    /// Full digest as hex, if computed.
    #[must_use]
    pub fn full_hex(&self) -> Option<String> {
        self.full_hash.as_ref().map(hash_to_hex)
    }
}

/// Errors that can occur during tree walking.
///
/// Per-path problems are not errors: they become rejected records.
/// Only resource exhaustion aborts a scan.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// A collection could not grow to hold another record.
    #[error("Out of memory while recording {0}")]
    OutOfMemory(PathBuf),
}

/// Errors that can occur during file hashing.
#[derive(thiserror::Error, Debug)]
pub enum HashError {
    /// The record is not a regular file.
    #[error("Not a regular file: {0}")]
    NotRegular(PathBuf),

    /// The specified file was not found.
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    /// Permission was denied when reading the file.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// An I/O error occurred while reading or mapping the file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

impl HashError {
    /// Classify an I/O error for `path`.
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_path_buf()),
            _ => Self::Io {
                path: path.to_path_buf(),
                source,
            },
        }
    }
}
