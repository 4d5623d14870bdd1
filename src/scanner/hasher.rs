//! BLAKE3 file hasher with memoized shallow and full digests.
//!
//! # Overview
//!
//! Two digests exist per candidate:
//!
//! - the **shallow** digest hashes a fixed-size prefix buffer (zero padded
//!   for short files), so it costs one small read regardless of file size;
//! - the **full** digest hashes the whole content through a memory map.
//!
//! Both are stored on the [`FileRecord`] the first time they are computed
//! and returned from there afterwards. Raw I/O goes through the
//! [`ContentSource`] trait, with [`DiskSource`] as the real implementation.

use std::fs::File;
use std::io::{self, Read};
use std::ops::Deref;
use std::path::Path;
use std::rc::Rc;

use memmap2::Mmap;

use super::{FileRecord, Hash, HashError};

/// Default shallow prefix length: one BLAKE3 block.
pub const DEFAULT_SHALLOW_LEN: usize = 64;

/// Whole-file content handed to the full hash.
#[derive(Debug)]
pub enum FileContents {
    /// Zero-length file; nothing was mapped.
    Empty,
    /// Read-only memory map of the file.
    Mapped(Mmap),
    /// Content held in memory.
    Buffered(Vec<u8>),
}

impl Deref for FileContents {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            Self::Empty => &[],
            Self::Mapped(map) => &map[..],
            Self::Buffered(bytes) => &bytes[..],
        }
    }
}

/// Raw file access used by the [`Hasher`].
pub trait ContentSource {
    /// Fill `buf` from the start of the file at `path`.
    ///
    /// Returns the number of bytes read, which is less than `buf.len()` only
    /// when the file is shorter.
    fn read_prefix(&self, path: &Path, buf: &mut [u8]) -> io::Result<usize>;

    /// Make the whole content of the file at `path` available.
    fn contents(&self, path: &Path) -> io::Result<FileContents>;
}

/// [`ContentSource`] backed by the filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSource;

impl ContentSource for DiskSource {
    fn read_prefix(&self, path: &Path, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = File::open(path)?;
        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn contents(&self, path: &Path) -> io::Result<FileContents> {
        let file = File::open(path)?;
        if file.metadata()?.len() == 0 {
            return Ok(FileContents::Empty);
        }
        // SAFETY: the map is read-only and dropped before this scan touches
        // the file again. Concurrent modification by another process can only
        // change the digest, which is the same exposure a buffered read has.
        let map = unsafe { Mmap::map(&file)? };
        Ok(FileContents::Mapped(map))
    }
}

/// Shallow/full hasher over a [`ContentSource`].
#[derive(Clone)]
pub struct Hasher {
    source: Rc<dyn ContentSource>,
    shallow_len: usize,
}

impl std::fmt::Debug for Hasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hasher")
            .field("source", &"<source>")
            .field("shallow_len", &self.shallow_len)
            .finish()
    }
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher reading from disk.
    #[must_use]
    pub fn new() -> Self {
        Self::with_source(Rc::new(DiskSource))
    }

    /// Create a hasher over a custom content source.
    #[must_use]
    pub fn with_source(source: Rc<dyn ContentSource>) -> Self {
        Self {
            source,
            shallow_len: DEFAULT_SHALLOW_LEN,
        }
    }

    /// Set the shallow prefix length (at least one byte).
    #[must_use]
    pub fn with_shallow_len(mut self, len: usize) -> Self {
        self.shallow_len = len.max(1);
        self
    }

    /// The shallow prefix length in bytes.
    #[must_use]
    pub fn shallow_len(&self) -> usize {
        self.shallow_len
    }

    /// Hash the zero-padded prefix of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or read.
    pub fn prehash(&self, path: &Path) -> Result<Hash, HashError> {
        let mut buf = vec![0u8; self.shallow_len];
        self.source
            .read_prefix(path, &mut buf)
            .map_err(|e| HashError::from_io(path, e))?;
        Ok(*blake3::hash(&buf).as_bytes())
    }

    /// Hash the whole content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or mapped.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        let contents = self
            .source
            .contents(path)
            .map_err(|e| HashError::from_io(path, e))?;
        Ok(*blake3::hash(&contents).as_bytes())
    }

    /// Memoized shallow digest of `record`.
    ///
    /// Returns `None` for non-regular records and on I/O failure; a failure
    /// is logged and leaves the record unhashed.
    pub fn shallow_digest(&self, record: &mut FileRecord) -> Option<Hash> {
        if let Some(hash) = record.shallow_hash {
            return Some(hash);
        }
        if !record.is_regular() {
            log::debug!("Not hashing {} ({})", record.path.display(), record.kind);
            return None;
        }
        match self.prehash(&record.path) {
            Ok(hash) => {
                record.shallow_hash = Some(hash);
                Some(hash)
            }
            Err(e) => {
                log::warn!("'{}' (shallow hash failed: {})", record.path.display(), e);
                None
            }
        }
    }

    /// Memoized full digest of `record`.
    ///
    /// Same failure handling as [`Hasher::shallow_digest`].
    pub fn full_digest(&self, record: &mut FileRecord) -> Option<Hash> {
        if let Some(hash) = record.full_hash {
            return Some(hash);
        }
        if !record.is_regular() {
            log::debug!("Not hashing {} ({})", record.path.display(), record.kind);
            return None;
        }
        match self.full_hash(&record.path) {
            Ok(hash) => {
                record.full_hash = Some(hash);
                Some(hash)
            }
            Err(e) => {
                log::warn!("'{}' (full hash failed: {})", record.path.display(), e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{classify, FileKind};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// In-memory source that counts every read.
    #[derive(Default)]
    struct CountingSource {
        files: HashMap<PathBuf, Vec<u8>>,
        prefix_reads: Cell<usize>,
        full_reads: Cell<usize>,
    }

    impl CountingSource {
        fn with_file(mut self, path: &str, content: &[u8]) -> Self {
            self.files.insert(PathBuf::from(path), content.to_vec());
            self
        }

        fn lookup(&self, path: &Path) -> io::Result<&Vec<u8>> {
            self.files
                .get(path)
                .ok_or_else(|| io::Error::from(io::ErrorKind::NotFound))
        }
    }

    impl ContentSource for CountingSource {
        fn read_prefix(&self, path: &Path, buf: &mut [u8]) -> io::Result<usize> {
            self.prefix_reads.set(self.prefix_reads.get() + 1);
            let content = self.lookup(path)?;
            let n = content.len().min(buf.len());
            buf[..n].copy_from_slice(&content[..n]);
            Ok(n)
        }

        fn contents(&self, path: &Path) -> io::Result<FileContents> {
            self.full_reads.set(self.full_reads.get() + 1);
            Ok(FileContents::Buffered(self.lookup(path)?.clone()))
        }
    }

    fn regular(path: &str, size: u64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), FileKind::Regular { size })
    }

    #[test]
    fn test_shallow_digest_is_memoized() {
        let source = Rc::new(CountingSource::default().with_file("/a", b"alpha"));
        let hasher = Hasher::with_source(source.clone());
        let mut record = regular("/a", 5);

        let first = hasher.shallow_digest(&mut record).unwrap();
        let second = hasher.shallow_digest(&mut record).unwrap();

        assert_eq!(first, second);
        assert_eq!(source.prefix_reads.get(), 1);
        assert_eq!(record.shallow_hash, Some(first));
    }

    #[test]
    fn test_full_digest_is_memoized() {
        let source = Rc::new(CountingSource::default().with_file("/a", b"alpha"));
        let hasher = Hasher::with_source(source.clone());
        let mut record = regular("/a", 5);

        let first = hasher.full_digest(&mut record).unwrap();
        let second = hasher.full_digest(&mut record).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, *blake3::hash(b"alpha").as_bytes());
        assert_eq!(source.full_reads.get(), 1);
        assert_eq!(source.prefix_reads.get(), 0);
    }

    #[test]
    fn test_shallow_digest_zero_pads_short_files() {
        let source = Rc::new(CountingSource::default().with_file("/short", b"ab"));
        let hasher = Hasher::with_source(source).with_shallow_len(8);
        let mut record = regular("/short", 2);

        let digest = hasher.shallow_digest(&mut record).unwrap();
        assert_eq!(digest, *blake3::hash(b"ab\0\0\0\0\0\0").as_bytes());
    }

    #[test]
    fn test_shallow_digest_ignores_bytes_past_prefix() {
        let source = Rc::new(
            CountingSource::default()
                .with_file("/one", b"same-prefix-then-one")
                .with_file("/two", b"same-prefix-then-two"),
        );
        let hasher = Hasher::with_source(source).with_shallow_len(11);
        let mut one = regular("/one", 20);
        let mut two = regular("/two", 20);

        assert_eq!(
            hasher.shallow_digest(&mut one),
            hasher.shallow_digest(&mut two)
        );
        assert_ne!(hasher.full_digest(&mut one), hasher.full_digest(&mut two));
    }

    #[test]
    fn test_failed_digest_leaves_record_unhashed() {
        let source = Rc::new(CountingSource::default());
        let hasher = Hasher::with_source(source.clone());
        let mut record = regular("/missing", 10);

        assert!(hasher.shallow_digest(&mut record).is_none());
        assert!(hasher.full_digest(&mut record).is_none());
        assert!(record.shallow_hash.is_none());
        assert!(record.full_hash.is_none());

        // A failure is not memoized, so the next call tries again.
        assert!(hasher.shallow_digest(&mut record).is_none());
        assert_eq!(source.prefix_reads.get(), 2);
    }

    #[test]
    fn test_non_regular_record_not_hashed() {
        let source = Rc::new(CountingSource::default());
        let hasher = Hasher::with_source(source.clone());
        let mut record = FileRecord::new(PathBuf::from("/dir"), FileKind::Directory);

        assert!(hasher.shallow_digest(&mut record).is_none());
        assert_eq!(source.prefix_reads.get(), 0);
    }

    #[test]
    fn test_disk_source_full_hash_matches_blake3() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("data.bin");
        let content = vec![7u8; 100_000];
        std::fs::write(&path, &content).unwrap();

        let hasher = Hasher::new();
        assert_eq!(
            hasher.full_hash(&path).unwrap(),
            *blake3::hash(&content).as_bytes()
        );
    }

    #[test]
    fn test_disk_source_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty");
        File::create(&path).unwrap();

        let hasher = Hasher::new();
        let mut record = classify(&path);
        assert_eq!(
            hasher.full_digest(&mut record),
            Some(*blake3::hash(b"").as_bytes())
        );
        assert_eq!(
            hasher.shallow_digest(&mut record),
            Some(*blake3::hash(&[0u8; DEFAULT_SHALLOW_LEN]).as_bytes())
        );
    }

    #[test]
    fn test_disk_source_missing_file() {
        let hasher = Hasher::new();
        let result = hasher.full_hash(Path::new("/nonexistent/file/12345"));
        assert!(matches!(result, Err(HashError::NotFound(_))));
    }
}
