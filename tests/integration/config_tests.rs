use bloomdupe::config::{Config, ConfigError, ConfigOverrides};
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

#[test]
fn test_config_file_values_are_used() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        "false_positive_rate = 0.001\nshallow_len = 256\nstrict = true\nindex_base = \"/var/tmp/dupes\"\n",
    )
    .unwrap();

    let config = Config::load(Some(&path), &ConfigOverrides::default()).unwrap();

    assert_eq!(config.false_positive_rate, 0.001);
    assert_eq!(config.shallow_len, 256);
    assert!(config.strict);
    assert_eq!(config.index_base_path(), Some(PathBuf::from("/var/tmp/dupes")));
    assert_eq!(config.max_path_len, Config::default().max_path_len);
}

#[test]
fn test_overrides_beat_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");
    fs::write(&path, "false_positive_rate = 0.001\nindex_base = \"keep\"\n").unwrap();

    let overrides = ConfigOverrides {
        false_positive_rate: Some(0.05),
        index_base: Some(String::new()),
        ..ConfigOverrides::default()
    };
    let config = Config::load(Some(&path), &overrides).unwrap();

    assert_eq!(config.false_positive_rate, 0.05);
    assert_eq!(config.index_base_path(), None);
}

#[test]
fn test_printed_config_loads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("config.toml");

    let original = Config {
        false_positive_rate: 0.02,
        shallow_len: 32,
        max_path_len: 4096,
        strict: true,
        index_base: "scan".to_string(),
    };
    fs::write(&path, original.to_toml().unwrap()).unwrap();

    let loaded = Config::load(Some(&path), &ConfigOverrides::default()).unwrap();
    assert_eq!(loaded, original);
}

#[test]
fn test_invalid_values_are_rejected() {
    let dir = tempdir().unwrap();

    let path = dir.path().join("rate.toml");
    fs::write(&path, "false_positive_rate = 0.0\n").unwrap();
    assert!(matches!(
        Config::load(Some(&path), &ConfigOverrides::default()),
        Err(ConfigError::FalsePositiveRate(_))
    ));

    let path = dir.path().join("shallow.toml");
    fs::write(&path, "shallow_len = 0\n").unwrap();
    assert!(matches!(
        Config::load(Some(&path), &ConfigOverrides::default()),
        Err(ConfigError::ShallowLen)
    ));
}

#[test]
fn test_malformed_file_is_load_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    fs::write(&path, "shallow_len = \"lots\"\n").unwrap();

    assert!(matches!(
        Config::load(Some(&path), &ConfigOverrides::default()),
        Err(ConfigError::Load(_))
    ));
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("absent.toml");

    assert!(matches!(
        Config::load(Some(&path), &ConfigOverrides::default()),
        Err(ConfigError::NotFound(p)) if p == path
    ));
}

#[test]
fn test_bloom_config_follows_rate() {
    let config = Config {
        false_positive_rate: 0.0001,
        ..Config::default()
    };
    assert_eq!(config.bloom_config().false_positive_rate, 0.0001);
}
