use bloomdupe::config::Config;
use bloomdupe::progress::{ProgressCallback, PHASE_FILTER, PHASE_WALK};
use bloomdupe::scanner::{FileKind, Walker, WalkerConfig};
use bloomdupe::session::Session;
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::tempdir;

fn session() -> Session {
    Session::new(Config {
        index_base: String::new(),
        ..Config::default()
    })
}

fn nested_dir(root: &Path, depth: usize) -> PathBuf {
    let mut dir = root.to_path_buf();
    for level in 0..depth {
        dir = dir.join(format!("level{level}"));
    }
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn test_scan_empty_directory() {
    let dir = tempdir().unwrap();
    let mut session = session();

    let report = session.run(&[dir.path().to_path_buf()], None).unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.stats.total_files, 0);
    assert_eq!(report.stats.candidates, 0);
}

#[test]
fn test_traversal_reaches_every_depth() {
    let dir = tempdir().unwrap();
    let depth = 12;
    let mut expected = 0;
    for level in 0..=depth {
        let at = nested_dir(dir.path(), level);
        fs::write(at.join(format!("file{level}.bin")), level.to_string()).unwrap();
        expected += 1;
    }

    let mut walker = Walker::new(WalkerConfig::default());
    walker.record(dir.path()).unwrap();
    walker.expand().unwrap();

    assert_eq!(walker.pending_len(), 0);
    assert_eq!(walker.candidates().len(), expected);

    let outcome = walker.finish();
    assert_eq!(outcome.total_files, expected);
    assert!(outcome.rejected.is_empty());
    assert!(outcome
        .candidates
        .iter()
        .all(|record| matches!(record.kind, FileKind::Regular { .. })));
}

#[test]
fn test_hidden_entries_are_skipped() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join(".hidden"), b"dup").unwrap();
    fs::create_dir(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join(".git").join("HEAD"), b"dup").unwrap();
    fs::write(dir.path().join("visible"), b"dup").unwrap();

    let mut session = session();
    let report = session.run(&[dir.path().to_path_buf()], None).unwrap();

    assert_eq!(report.stats.candidates, 1);
    assert!(report.groups.is_empty());
}

#[test]
fn test_path_length_guard_boundary() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("abc"), b"x").unwrap();
    let child_len = dir.path().join("abc").as_os_str().len();

    let mut at_limit = Walker::new(WalkerConfig::default().with_max_path_len(child_len));
    at_limit.record(dir.path()).unwrap();
    at_limit.expand().unwrap();
    let outcome = at_limit.finish();
    assert!(outcome.candidates.is_empty());
    assert_eq!(outcome.skipped_long_paths, 1);

    let mut above_limit = Walker::new(WalkerConfig::default().with_max_path_len(child_len + 1));
    above_limit.record(dir.path()).unwrap();
    above_limit.expand().unwrap();
    let outcome = above_limit.finish();
    assert_eq!(outcome.candidates.len(), 1);
    assert_eq!(outcome.skipped_long_paths, 0);
}

#[test]
fn test_three_identical_and_one_distinct() {
    let dir = tempdir().unwrap();
    let content = vec![7u8; 100];
    let mut distinct = content.clone();
    distinct[99] = 8;

    fs::write(dir.path().join("a.bin"), &content).unwrap();
    fs::write(dir.path().join("b.bin"), &content).unwrap();
    fs::write(dir.path().join("c.bin"), &content).unwrap();
    fs::write(dir.path().join("d.bin"), &distinct).unwrap();

    let mut session = session();
    let report = session.run(&[dir.path().to_path_buf()], None).unwrap();

    assert_eq!(report.groups.len(), 1);
    let group = &report.groups[0];
    assert_eq!(group.len(), 3);
    assert_eq!(group.size, 100);
    assert_eq!(group.wasted_space(), 200);
    assert!(!group.files.contains(&dir.path().join("d.bin")));

    assert_eq!(report.stats.wasted_bytes, 200);
    assert_eq!(report.stats.files_in_groups, 3);
    assert_eq!(report.stats.duplicate_files, 2);
}

#[test]
fn test_duplicates_across_roots() {
    let left = tempdir().unwrap();
    let right = tempdir().unwrap();
    fs::write(left.path().join("photo.jpg"), b"same bytes").unwrap();
    fs::write(right.path().join("copy.jpg"), b"same bytes").unwrap();

    let mut session = session();
    let report = session
        .run(&[left.path().to_path_buf(), right.path().to_path_buf()], None)
        .unwrap();

    assert_eq!(report.groups.len(), 1);
    let mut files = report.groups[0].files.clone();
    files.sort();
    let mut expected = vec![left.path().join("photo.jpg"), right.path().join("copy.jpg")];
    expected.sort();
    assert_eq!(files, expected);
}

#[test]
fn test_same_prefix_different_tail_not_grouped() {
    let dir = tempdir().unwrap();
    let mut a = vec![1u8; 4096];
    let mut b = a.clone();
    a[4000] = 2;
    b[4000] = 3;
    fs::write(dir.path().join("a"), &a).unwrap();
    fs::write(dir.path().join("b"), &b).unwrap();

    let mut session = session();
    let report = session.run(&[dir.path().to_path_buf()], None).unwrap();

    assert!(report.groups.is_empty());
    assert_eq!(report.stats.full_hashed, 2);
}

#[test]
fn test_file_given_directly_is_a_candidate() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("single.txt");
    fs::write(&file, b"content").unwrap();

    let mut session = session();
    let report = session.run(&[file.clone()], None).unwrap();

    assert_eq!(report.stats.candidates, 1);
    assert_eq!(session.candidates()[0].path, file);
}

#[test]
fn test_missing_root_is_counted_invalid() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("does-not-exist");

    let mut session = session();
    let report = session.run(&[missing.clone()], None).unwrap();

    assert_eq!(report.stats.invalid, 1);
    assert_eq!(report.stats.ignored, 1);
    assert_eq!(session.rejected()[0].path, missing);
    assert_eq!(session.rejected()[0].kind, FileKind::Invalid);
}

#[cfg(unix)]
#[test]
fn test_symlinks_are_irregular() {
    let dir = tempdir().unwrap();
    let target = dir.path().join("target.txt");
    fs::write(&target, b"content").unwrap();
    std::os::unix::fs::symlink(&target, dir.path().join("link.txt")).unwrap();

    let mut session = session();
    let report = session.run(&[dir.path().to_path_buf()], None).unwrap();

    assert_eq!(report.stats.candidates, 1);
    assert_eq!(report.stats.irregular, 1);
    assert!(report.groups.is_empty());
}

#[derive(Default)]
struct PhaseLog {
    events: RefCell<Vec<String>>,
    ticks: RefCell<usize>,
}

impl ProgressCallback for PhaseLog {
    fn on_phase_start(&self, phase: &str, total: usize) {
        self.events.borrow_mut().push(format!("start {phase} {total}"));
    }

    fn on_progress(&self, _current: usize, _path: &str) {
        *self.ticks.borrow_mut() += 1;
    }

    fn on_phase_end(&self, phase: &str) {
        self.events.borrow_mut().push(format!("end {phase}"));
    }
}

#[test]
fn test_progress_reports_both_phases() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"1").unwrap();
    fs::write(dir.path().join("b"), b"2").unwrap();

    let log = Rc::new(PhaseLog::default());
    let mut session = session().with_progress_callback(log.clone());
    session.run(&[dir.path().to_path_buf()], None).unwrap();

    assert_eq!(
        *log.events.borrow(),
        vec![
            format!("start {PHASE_WALK} 0"),
            format!("end {PHASE_WALK}"),
            format!("start {PHASE_FILTER} 2"),
            format!("end {PHASE_FILTER}"),
        ]
    );
    // Two files walked, two files filtered
    assert_eq!(*log.ticks.borrow(), 4);
}
