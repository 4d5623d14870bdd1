use bloomdupe::config::Config;
use bloomdupe::scanner::{ContentSource, DiskSource, FileContents, FileKind, FileRecord, Hasher};
use bloomdupe::session::Session;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::tempdir;

/// Disk-backed source that counts reads per path.
#[derive(Default)]
struct CountingSource {
    prefix_reads: RefCell<HashMap<PathBuf, usize>>,
    full_reads: RefCell<HashMap<PathBuf, usize>>,
}

impl CountingSource {
    fn prefix_reads(&self, path: &Path) -> usize {
        self.prefix_reads.borrow().get(path).copied().unwrap_or(0)
    }

    fn full_reads(&self, path: &Path) -> usize {
        self.full_reads.borrow().get(path).copied().unwrap_or(0)
    }
}

impl ContentSource for CountingSource {
    fn read_prefix(&self, path: &Path, buf: &mut [u8]) -> io::Result<usize> {
        *self
            .prefix_reads
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default() += 1;
        DiskSource.read_prefix(path, buf)
    }

    fn contents(&self, path: &Path) -> io::Result<FileContents> {
        *self
            .full_reads
            .borrow_mut()
            .entry(path.to_path_buf())
            .or_default() += 1;
        DiskSource.contents(path)
    }
}

fn regular(path: PathBuf) -> FileRecord {
    let size = fs::metadata(&path).unwrap().len();
    FileRecord::new(path, FileKind::Regular { size })
}

#[test]
fn test_digests_are_memoized() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file.bin");
    fs::write(&path, vec![3u8; 1000]).unwrap();

    let source = Rc::new(CountingSource::default());
    let hasher = Hasher::with_source(source.clone());
    let mut record = regular(path.clone());

    let first = hasher.shallow_digest(&mut record);
    let second = hasher.shallow_digest(&mut record);
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(source.prefix_reads(&path), 1);

    let first = hasher.full_digest(&mut record);
    let second = hasher.full_digest(&mut record);
    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(source.full_reads(&path), 1);
}

#[test]
fn test_short_file_prefix_is_zero_padded() {
    let dir = tempdir().unwrap();
    let short = dir.path().join("short");
    let padded = dir.path().join("padded");
    fs::write(&short, b"abc").unwrap();
    fs::write(&padded, b"abc\0\0\0").unwrap();

    let hasher = Hasher::new();
    assert_eq!(hasher.prehash(&short).unwrap(), hasher.prehash(&padded).unwrap());
    assert_ne!(
        hasher.full_hash(&short).unwrap(),
        hasher.full_hash(&padded).unwrap()
    );
}

#[test]
fn test_non_regular_records_are_not_hashed() {
    let dir = tempdir().unwrap();
    let source = Rc::new(CountingSource::default());
    let hasher = Hasher::with_source(source.clone());
    let mut record = FileRecord::new(dir.path().to_path_buf(), FileKind::Directory);

    assert!(hasher.shallow_digest(&mut record).is_none());
    assert!(hasher.full_digest(&mut record).is_none());
    assert_eq!(source.prefix_reads(dir.path()), 0);
    assert_eq!(source.full_reads(dir.path()), 0);
}

#[test]
fn test_session_reads_each_file_at_most_once() {
    let dir = tempdir().unwrap();
    for name in ["a", "b", "c"] {
        fs::write(dir.path().join(name), b"duplicate content").unwrap();
    }
    fs::write(dir.path().join("u"), b"something else entirely").unwrap();

    let source = Rc::new(CountingSource::default());
    let mut session = Session::new(Config {
        index_base: String::new(),
        ..Config::default()
    })
    .with_content_source(source.clone());

    let report = session.run(&[dir.path().to_path_buf()], None).unwrap();
    assert_eq!(report.groups.len(), 1);

    for name in ["a", "b", "c", "u"] {
        let path = dir.path().join(name);
        assert_eq!(source.prefix_reads(&path), 1, "prefix reads of {name}");
        assert!(source.full_reads(&path) <= 1, "full reads of {name}");
    }
    for name in ["a", "b", "c"] {
        assert_eq!(source.full_reads(&dir.path().join(name)), 1);
    }
}

#[test]
fn test_shallow_len_changes_prefix_digest() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("file");
    fs::write(&path, vec![9u8; 256]).unwrap();

    let short = Hasher::new().with_shallow_len(16);
    let long = Hasher::new().with_shallow_len(128);
    assert_eq!(short.shallow_len(), 16);
    assert_ne!(short.prehash(&path).unwrap(), long.prehash(&path).unwrap());
    assert_eq!(Hasher::new().with_shallow_len(0).shallow_len(), 1);
}
