use bloomdupe::config::Config;
use bloomdupe::persist::{self, HashIndex, PersistError};
use bloomdupe::session::{Session, SessionError};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn persisting_session(base: &Path) -> Session {
    Session::new(Config {
        index_base: base.to_string_lossy().into_owned(),
        ..Config::default()
    })
}

fn write_tree(root: &Path) {
    fs::write(root.join("a.txt"), b"shared content").unwrap();
    fs::write(root.join("b.txt"), b"shared content").unwrap();
    fs::write(root.join("c.txt"), b"other content").unwrap();
}

#[test]
fn test_session_writes_filter_and_index() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_tree(data.path());
    let base = out.path().join("filter");

    let mut session = persisting_session(&base);
    let report = session.run(&[data.path().to_path_buf()], None).unwrap();

    let persisted = report.persisted.unwrap();
    assert_eq!(persisted.filter, out.path().join("filter.bloom"));
    assert_eq!(persisted.index, out.path().join("filter.db"));
    assert!(persisted.backups.is_empty());
    assert_eq!(persisted.rows, report.stats.full_hashed);

    let filter = session.filter().unwrap();
    let sizing = persist::read_sizing(&persisted.filter).unwrap();
    assert_eq!(sizing, persist::FilterSizing::of(filter));
    let file_len = fs::metadata(&persisted.filter).unwrap().len();
    assert_eq!(file_len, 8 + filter.byte_len() as u64);

    let index = HashIndex::open(&persisted.index).unwrap();
    let group = &report.groups[0];
    let rows = index.records_for(&group.hash_hex()).unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| row.size == group.size));
}

#[test]
fn test_recovered_filter_answers_like_the_original() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_tree(data.path());
    let base = out.path().join("filter");

    let mut first = persisting_session(&base);
    first.run(&[data.path().to_path_buf()], None).unwrap();
    let original = first.filter().unwrap().clone();
    let keys: Vec<String> = first
        .candidates()
        .iter()
        .filter_map(|record| record.shallow_hex())
        .collect();

    let mut second = Session::new(Config {
        index_base: String::new(),
        ..Config::default()
    });
    second.scan(&[data.path().to_path_buf()]).unwrap();
    second
        .build_filter(Some(&out.path().join("filter.bloom")))
        .unwrap();

    let recovered = second.filter().unwrap();
    assert_eq!(recovered.as_bytes(), original.as_bytes());
    assert_eq!(recovered.hash_count(), original.hash_count());
    for key in &keys {
        assert!(recovered.query(key));
    }
    for probe in ["not-a-key", "deadbeef", "another"] {
        assert_eq!(recovered.query(probe), original.query(probe));
    }
}

#[test]
fn test_recover_with_different_file_count_fails() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_tree(data.path());
    let base = out.path().join("filter");

    persisting_session(&base)
        .run(&[data.path().to_path_buf()], None)
        .unwrap();

    fs::write(data.path().join("d.txt"), b"a fourth file").unwrap();

    let mut session = Session::new(Config {
        index_base: String::new(),
        ..Config::default()
    });
    let err = session
        .run(
            &[data.path().to_path_buf()],
            Some(&out.path().join("filter.bloom")),
        )
        .unwrap_err();

    assert!(matches!(
        err,
        SessionError::Persist(PersistError::FilterMismatch {
            expected: 5,
            found: 4,
            ..
        })
    ));
}

#[test]
fn test_recover_with_different_rate_fails() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_tree(data.path());
    let base = out.path().join("filter");

    persisting_session(&base)
        .run(&[data.path().to_path_buf()], None)
        .unwrap();

    // 0.012 gives 28 bits instead of 29: same 4-byte table, different modulus
    let mut session = Session::new(Config {
        index_base: String::new(),
        false_positive_rate: 0.012,
        ..Config::default()
    });
    session.scan(&[data.path().to_path_buf()]).unwrap();
    let err = session
        .build_filter(Some(&out.path().join("filter.bloom")))
        .unwrap_err();

    match err {
        SessionError::Persist(PersistError::SizingMismatch {
            expected, found, ..
        }) => {
            assert_eq!(found.bit_count, 29);
            assert_eq!(expected.bit_count, 28);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(session.filter().is_none());
}

#[test]
fn test_back_to_back_runs_keep_every_backup() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_tree(data.path());
    let base = out.path().join("filter");

    let mut backups = Vec::new();
    for _ in 0..3 {
        let report = persisting_session(&base)
            .run(&[data.path().to_path_buf()], None)
            .unwrap();
        backups.extend(report.persisted.unwrap().backups);
    }

    assert_eq!(backups.len(), 6);
    let mut unique = backups.clone();
    unique.sort();
    unique.dedup();
    assert_eq!(unique.len(), 6);
    assert!(backups.iter().all(|backup| backup.is_file()));
}

#[test]
fn test_second_run_rotates_previous_files() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_tree(data.path());
    let base = out.path().join("filter");

    persisting_session(&base)
        .run(&[data.path().to_path_buf()], None)
        .unwrap();
    let report = persisting_session(&base)
        .run(&[data.path().to_path_buf()], None)
        .unwrap();

    let persisted = report.persisted.unwrap();
    assert_eq!(persisted.backups.len(), 3);
    for backup in &persisted.backups {
        assert!(backup.is_file(), "missing backup {}", backup.display());
        assert!(backup.to_string_lossy().ends_with(".bak"));
    }
    assert!(persisted.filter.is_file());
    assert!(persisted.index.is_file());
}

#[test]
fn test_persist_requires_filter_and_path() {
    let out = tempdir().unwrap();
    let base = out.path().join("filter");

    assert!(matches!(
        persist::persist(&base, None, &[]),
        Err(PersistError::NoFilter)
    ));
    assert!(matches!(
        persist::persist(Path::new(""), None, &[]),
        Err(PersistError::EmptyPath)
    ));
    assert!(!out.path().join("filter.bloom").exists());
}

#[test]
fn test_recover_truncated_snapshot() {
    let data = tempdir().unwrap();
    let out = tempdir().unwrap();
    write_tree(data.path());
    let base = out.path().join("filter");

    persisting_session(&base)
        .run(&[data.path().to_path_buf()], None)
        .unwrap();

    let snapshot = out.path().join("filter.bloom");
    let bytes = fs::read(&snapshot).unwrap();
    fs::write(&snapshot, &bytes[..bytes.len() - 1]).unwrap();

    let mut session = Session::new(Config {
        index_base: String::new(),
        ..Config::default()
    });
    session.scan(&[data.path().to_path_buf()]).unwrap();
    let err = session.build_filter(Some(&snapshot)).unwrap_err();
    assert!(matches!(
        err,
        SessionError::Persist(PersistError::Truncated { .. })
    ));
}
