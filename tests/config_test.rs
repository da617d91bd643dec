//! Configuration loading tests
//!
//! Tests that configuration files are created, read back and
//! provide expected default values

use speakgate::config::Config;
use speakgate::speech::BackendKind;
use std::fs;
use std::time::Duration;

#[test]
fn test_config_created_when_missing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speakgate.cfg");
    assert!(!path.exists());

    let config = Config::load_from(&path).expect("Failed to load config");
    assert!(path.exists());
    assert_eq!(config.path(), &path);
    assert_eq!(config.backend().unwrap(), BackendKind::Native);

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.contains("[speech]"));
    assert!(written.contains("backend=native"));
}

#[test]
fn test_config_reads_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speakgate.cfg");
    fs::write(
        &path,
        "[speech]\nbackend=simulated\npoll_interval_ms=20\ndefault_language=de-DE\n\n\
         [simulated]\nword_ms=5\n\n[demo]\nmax_count=3\n",
    )
    .unwrap();

    let config = Config::load_from(&path).expect("Failed to load config");
    assert_eq!(config.backend().unwrap(), BackendKind::Simulated);
    assert_eq!(config.poll_interval(), Duration::from_millis(20));
    assert_eq!(config.default_language().as_deref(), Some("de-DE"));
    assert_eq!(config.simulated_word_time(), Duration::from_millis(5));
    assert_eq!(config.max_count(), 3);

    // Keys absent from the file use defaults
    assert!(config.greeting().contains("Speak n Leak"));
}

#[test]
fn test_config_save_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("speakgate.cfg");

    let mut config = Config::load_from(&path).unwrap();
    config.set("demo", "greeting", "Hi there");
    config.save().unwrap();

    let reloaded = Config::load_from(&path).unwrap();
    assert_eq!(reloaded.greeting(), "Hi there");
}
