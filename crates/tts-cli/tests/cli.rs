//! Tests for configuration resolution and command output.

use std::fs;
use std::path::PathBuf;

use tts_cli::render::{classes_table, describe_outcome, explain, level_table, restore_summary};
use tts_cli::session::{ConfigOverrides, parse_object, resolve_config};
use tts_persistence::{PersistError, RestoreReport, SaveOutcome};
use tts_standards::{InsulationTable, StandardFamily};

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn config_file_values_are_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persistence.toml");
    fs::write(
        &path,
        "base_url = \"http://lab:9000/api/data\"\ncache_ttl_ms = 100\nlocal_dir = \"/tmp/tts-stores\"\n",
    )
    .unwrap();

    let config = resolve_config(&ConfigOverrides {
        config: Some(path),
        ..ConfigOverrides::default()
    })
    .unwrap();

    assert_eq!(config.base_url, "http://lab:9000/api/data");
    assert_eq!(config.cache_ttl_ms, 100);
    assert_eq!(config.local_dir, Some(PathBuf::from("/tmp/tts-stores")));
}

#[test]
fn flags_override_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persistence.toml");
    fs::write(&path, "base_url = \"http://lab:9000/api/data\"\n").unwrap();

    let config = resolve_config(&ConfigOverrides {
        config: Some(path),
        base_url: Some("http://other:8000/api/data".to_string()),
        local_dir: Some(dir.path().join("stores")),
    })
    .unwrap();

    assert_eq!(config.base_url, "http://other:8000/api/data");
    assert_eq!(config.local_dir, Some(dir.path().join("stores")));
}

#[test]
fn missing_config_file_uses_defaults_with_local_dir() {
    let dir = tempfile::tempdir().unwrap();

    let config = resolve_config(&ConfigOverrides {
        config: Some(dir.path().join("absent.toml")),
        ..ConfigOverrides::default()
    })
    .unwrap();

    assert_eq!(config.base_url, tts_persistence::DEFAULT_BASE_URL);
    assert!(config.local_dir.is_some());
}

#[test]
fn malformed_config_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("persistence.toml");
    fs::write(&path, "base_url = [").unwrap();

    let error = resolve_config(&ConfigOverrides {
        config: Some(path),
        ..ConfigOverrides::default()
    })
    .unwrap_err();

    assert!(format!("{error:#}").contains("load config"));
}

// ============================================================================
// JSON arguments
// ============================================================================

#[test]
fn json_argument_must_be_an_object() {
    let object = parse_object(r#"{"formData": {"potencia_mva": 50}}"#).unwrap();
    assert!(object.contains_key("formData"));

    assert!(parse_object("[1, 2]").is_err());
    assert!(parse_object("not json").is_err());
}

// ============================================================================
// Output
// ============================================================================

#[test]
fn level_table_lists_offered_options() {
    let table = InsulationTable::embedded().unwrap();
    let level = table.find(StandardFamily::Iec, 245.0).unwrap();

    let rendered = level_table(level, StandardFamily::Iec).to_string();

    assert!(rendered.contains("850 kVp, 950 kVp, 1050 kVp"));
    assert!(rendered.contains("650 kVp, 750 kVp, 850 kVp"));
    assert!(rendered.contains("SIL (kVp)"));
}

#[test]
fn ieee_tables_use_bsl_header() {
    let table = InsulationTable::embedded().unwrap();

    let rendered = classes_table(table, StandardFamily::Ieee).to_string();

    assert!(rendered.contains("BSL (kVp)"));
    assert!(!rendered.contains("SIL (kVp)"));
}

#[test]
fn classes_table_has_a_row_per_class() {
    let table = InsulationTable::embedded().unwrap();

    let rendered = classes_table(table, StandardFamily::Iec);

    assert_eq!(
        rendered.row_iter().count(),
        table.voltage_classes(StandardFamily::Iec).len()
    );
}

#[test]
fn restore_summary_names_restored_stores() {
    let report = RestoreReport {
        restored_stores: vec!["losses".to_string(), "impulse".to_string()],
        total_stores: 3,
    };

    insta::assert_snapshot!(
        restore_summary(&report),
        @"Restored 2 store(s): losses, impulse (3 stores on the server)"
    );
}

#[test]
fn persistence_errors_carry_suggestions() {
    let error = PersistError::HttpStatus {
        status: 404,
        url: "http://localhost:8000/api/data/stores/losses".to_string(),
    };

    assert_eq!(
        explain(&error),
        "The server rejected the request (HTTP 404). The store does not exist on the server."
    );

    let error = PersistError::HttpStatus {
        status: 500,
        url: "http://localhost:8000/api/data/stores/losses".to_string(),
    };
    assert_eq!(explain(&error), "The server rejected the request (HTTP 500).");
}

#[test]
fn outcomes_describe_where_data_went() {
    assert_eq!(describe_outcome(SaveOutcome::Remote), "saved to the backend");
    assert!(describe_outcome(SaveOutcome::LocalFallback).contains("locally"));
    assert!(describe_outcome(SaveOutcome::EmergencyLocal).contains("failed"));
}
