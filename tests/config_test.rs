//! Configuration loading tests

use std::io::Write;
use std::sync::Arc;

use assert_matches::assert_matches;
use event_admission::admission::{AdmissionCoordinator, InMemoryCatalog, InMemoryStore, SystemClock};
use event_admission::config::{AdmissionConfig, Settings};
use event_admission::EngineError;

fn settings_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_file_overrides_defaults() {
    let file = settings_file(
        r#"
        [logging]
        level = "debug"
        json = true

        [admission]
        lock_timeout_ms = 250
        default_token_expiry_hours = 12
        checkin_base_url = "https://dance.example.org/scan"
        "#,
    );

    let settings = Settings::from_file(file.path()).unwrap();
    assert_eq!(settings.logging.level, "debug");
    assert!(settings.logging.json);
    assert_eq!(settings.admission.lock_timeout_ms, 250);
    assert_eq!(settings.admission.default_token_expiry_hours, 12);
    assert_eq!(settings.admission.max_token_expiry_hours, 168);
    assert_eq!(settings.database.max_connections, 10);
    assert!(settings.validate().is_ok());
}

#[test]
fn test_inverted_expiry_range_is_rejected() {
    let file = settings_file(
        r#"
        [admission]
        min_token_expiry_hours = 48
        max_token_expiry_hours = 24
        "#,
    );

    let settings = Settings::from_file(file.path()).unwrap();
    assert_matches!(settings.validate(), Err(EngineError::Config(_)));
}

#[test]
fn test_unknown_log_level_is_rejected() {
    let file = settings_file(
        r#"
        [logging]
        level = "chatty"
        "#,
    );

    let settings = Settings::from_file(file.path()).unwrap();
    assert_matches!(settings.validate(), Err(EngineError::Config(_)));
}

#[test]
fn test_malformed_checkin_url_is_rejected() {
    let config = AdmissionConfig {
        checkin_base_url: "not a url".to_string(),
        ..AdmissionConfig::default()
    };

    let coordinator = AdmissionCoordinator::new(
        Arc::new(InMemoryCatalog::new()),
        Arc::new(InMemoryStore::new()),
        Arc::new(SystemClock),
        config,
    );
    assert_matches!(coordinator, Err(EngineError::UrlParse(_)));
}

#[test]
fn test_coordinator_rejects_inverted_expiry_range() {
    let config = AdmissionConfig {
        min_token_expiry_hours: 48,
        max_token_expiry_hours: 12,
        ..AdmissionConfig::default()
    };

    let coordinator = AdmissionCoordinator::new(
        Arc::new(InMemoryCatalog::new()),
        Arc::new(InMemoryStore::new()),
        Arc::new(SystemClock),
        config,
    );
    assert_matches!(coordinator, Err(EngineError::Config(_)));
}
