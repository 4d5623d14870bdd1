//! Filter snapshot file.
//!
//! Layout:
//!
//! ```text
//! [u64 little-endian: byte length L = ceil(m / 8)][L bytes of bit array]
//! ```
//!
//! Bit `i` of the filter is bit `i % 8` of byte `i / 8`. The header carries
//! no `m` or `k`, so [`write_filter`] also writes a small JSON sizing record
//! to `<snapshot>.meta`:
//!
//! ```text
//! {"bit_count":959,"hash_count":7}
//! ```
//!
//! [`recover`] re-derives the parameters from the current candidate count and
//! refuses a snapshot whose byte length or sizing record disagrees. Probing a
//! bit array with a different `m` or `k` would lose inserted keys.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{target_path, PersistError};
use crate::duplicates::{BloomConfig, BloomFilter};

/// Extension appended to a snapshot path for its sizing record.
pub const SIZING_EXTENSION: &str = "meta";

const HEADER_LEN: u64 = 8;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> PersistError + '_ {
    move |source| PersistError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Filter parameters a snapshot was written with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSizing {
    /// Number of bits `m`
    pub bit_count: usize,
    /// Number of probes `k`
    pub hash_count: u32,
}

impl FilterSizing {
    /// Sizing of `filter`.
    #[must_use]
    pub fn of(filter: &BloomFilter) -> Self {
        Self {
            bit_count: filter.bit_count(),
            hash_count: filter.hash_count(),
        }
    }
}

impl fmt::Display for FilterSizing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m={} k={}", self.bit_count, self.hash_count)
    }
}

/// `<snapshot>.meta`, where the sizing record of `snapshot` lives.
#[must_use]
pub fn sizing_path(snapshot: &Path) -> PathBuf {
    target_path(snapshot, SIZING_EXTENSION)
}

/// Read the sizing record stored next to `snapshot`.
///
/// # Errors
///
/// Returns [`PersistError::Io`] if the record is missing or unreadable, or
/// [`PersistError::Record`] if it is not valid JSON.
pub fn read_sizing(snapshot: &Path) -> Result<FilterSizing, PersistError> {
    let path = sizing_path(snapshot);
    let raw = fs::read(&path).map_err(io_error(&path))?;
    Ok(serde_json::from_slice(&raw)?)
}

/// Write `bytes`, warning about any tail the file would not take.
fn write_logged(file: &mut File, path: &Path, bytes: &[u8], what: &str) -> Result<(), PersistError> {
    let mut written = 0;
    while written < bytes.len() {
        match file.write(&bytes[written..]) {
            Ok(0) => {
                log::warn!(
                    "bytes lost ({what}): {} of {} written to {}",
                    written,
                    bytes.len(),
                    path.display()
                );
                return Ok(());
            }
            Ok(n) => written += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(io_error(path)(e)),
        }
    }
    Ok(())
}

/// Write a snapshot of `filter` to `path`, and its sizing record next to it,
/// replacing any files there.
///
/// # Errors
///
/// Returns [`PersistError::Io`] if a file cannot be created or written.
pub fn write_filter(path: &Path, filter: &BloomFilter) -> Result<(), PersistError> {
    let mut file = File::create(path).map_err(io_error(path))?;

    let header = (filter.byte_len() as u64).to_le_bytes();
    write_logged(&mut file, path, &header, "bloom header persist")?;
    write_logged(&mut file, path, filter.as_bytes(), "bloom table persist")?;

    if let Err(e) = file.sync_all() {
        log::warn!("{} (sync failed: {})", path.display(), e);
    }
    log::debug!(
        "Wrote {} filter bytes to {}",
        filter.byte_len(),
        path.display()
    );

    let meta = sizing_path(path);
    let record = serde_json::to_vec(&FilterSizing::of(filter))?;
    fs::write(&meta, record).map_err(io_error(&meta))?;
    Ok(())
}

fn read_header(file: &mut File, path: &Path, file_len: u64) -> Result<u64, PersistError> {
    if file_len < HEADER_LEN {
        return Err(PersistError::Truncated {
            path: path.to_path_buf(),
            expected: HEADER_LEN,
            found: file_len,
        });
    }
    let mut header = [0u8; HEADER_LEN as usize];
    file.read_exact(&mut header).map_err(io_error(path))?;
    Ok(u64::from_le_bytes(header))
}

fn read_body(file: &mut File, path: &Path, file_len: u64, len: u64) -> Result<Vec<u8>, PersistError> {
    let expected = HEADER_LEN.saturating_add(len);
    if file_len < expected {
        return Err(PersistError::Truncated {
            path: path.to_path_buf(),
            expected,
            found: file_len,
        });
    }
    if file_len > expected {
        log::warn!(
            "{} has {} trailing bytes after the filter",
            path.display(),
            file_len - expected
        );
    }

    let len = usize::try_from(len).map_err(|_| PersistError::Truncated {
        path: path.to_path_buf(),
        expected,
        found: file_len,
    })?;
    let mut bytes = vec![0u8; len];
    file.read_exact(&mut bytes).map_err(io_error(path))?;
    Ok(bytes)
}

/// Read the raw bit array stored at `path`.
///
/// # Errors
///
/// Returns [`PersistError::Truncated`] if the file is shorter than its
/// header says, or [`PersistError::Io`] on read failure.
pub fn read_filter(path: &Path) -> Result<Vec<u8>, PersistError> {
    let mut file = File::open(path).map_err(io_error(path))?;
    let file_len = file.metadata().map_err(io_error(path))?.len();
    let len = read_header(&mut file, path, file_len)?;
    read_body(&mut file, path, file_len, len)
}

/// Rebuild a filter for `candidate_count` candidates from the snapshot at `path`.
///
/// The filter is sized from `candidate_count` and `config`, not from the
/// file. The stored byte length must equal the sized filter's byte length,
/// and the sizing record must name the same `m` and `k`.
///
/// # Errors
///
/// * [`PersistError::FilterMismatch`] if the lengths differ.
/// * [`PersistError::SizingMismatch`] if `m` or `k` differ.
/// * [`PersistError::Io`] if the sizing record is missing.
/// * [`PersistError::Truncated`] if the body is short.
/// * [`PersistError::Io`] on open or read failure.
pub fn recover(
    path: &Path,
    candidate_count: usize,
    config: &BloomConfig,
) -> Result<BloomFilter, PersistError> {
    let mut filter = BloomFilter::with_capacity(candidate_count, config);

    let mut file = File::open(path).map_err(io_error(path))?;
    let file_len = file.metadata().map_err(io_error(path))?.len();
    let stored = read_header(&mut file, path, file_len)?;

    if stored != filter.byte_len() as u64 {
        return Err(PersistError::FilterMismatch {
            path: path.to_path_buf(),
            expected: filter.byte_len(),
            found: stored,
        });
    }

    let found = read_sizing(path)?;
    let expected = FilterSizing::of(&filter);
    if found != expected {
        return Err(PersistError::SizingMismatch {
            path: path.to_path_buf(),
            expected,
            found,
        });
    }

    let bytes = read_body(&mut file, path, file_len, stored)?;
    filter
        .load_bytes(&bytes)
        .map_err(|_| PersistError::FilterMismatch {
            path: path.to_path_buf(),
            expected: filter.byte_len(),
            found: bytes.len() as u64,
        })?;

    log::info!(
        "Recovered {} filter bytes ({} bits set) from {}",
        bytes.len(),
        filter.ones(),
        path.display()
    );
    Ok(filter)
}
