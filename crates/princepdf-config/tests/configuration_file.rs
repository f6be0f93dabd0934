//! Configuration file loading and validation.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use rstest::{fixture, rstest};
use tempfile::TempDir;

use princepdf_config::{Config, ConfigError, LogFormat};

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("create temp dir")
}

fn write_config(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("princepdf.json");
    fs::write(&path, contents).expect("write config");
    path
}

#[rstest]
fn empty_object_yields_defaults(temp_dir: TempDir) {
    let path = write_config(&temp_dir, "{}");

    let config = Config::load_from_path(&path).expect("load config");

    assert_eq!(config, Config::default());
}

#[rstest]
fn partial_sections_keep_remaining_defaults(temp_dir: TempDir) {
    let path = write_config(
        &temp_dir,
        r#"{
            "engine": { "command": "/opt/prince/bin/prince", "greeting_timeout_ms": 2500 },
            "pool": { "sessions": 4, "submit_timeout_ms": 30000 },
            "log_format": "compact"
        }"#,
    );

    let config = Config::load_from_path(&path).expect("load config");

    assert_eq!(config.engine.command, PathBuf::from("/opt/prince/bin/prince"));
    assert_eq!(config.engine.args, vec!["--control"]);
    assert_eq!(config.engine.greeting_timeout(), Duration::from_millis(2_500));
    assert_eq!(config.pool.sessions, 4);
    assert_eq!(config.pool.queue_capacity, 1);
    assert_eq!(config.pool.submit_timeout_ms, Some(30_000));
    assert_eq!(config.log_format(), LogFormat::Compact);
    assert_eq!(config.log_filter(), "info");
}

#[rstest]
fn missing_file_reports_read_error(temp_dir: TempDir) {
    let path = temp_dir.path().join("absent.json");

    let error = Config::load_from_path(&path).expect_err("load must fail");

    assert!(matches!(error, ConfigError::Read { .. }));
    assert!(error.to_string().contains("absent.json"));
}

#[rstest]
fn malformed_json_reports_parse_error(temp_dir: TempDir) {
    let path = write_config(&temp_dir, r#"{ "pool": { "sessions": "many" } }"#);

    let error = Config::load_from_path(&path).expect_err("load must fail");

    assert!(matches!(error, ConfigError::Parse { .. }));
}

#[rstest]
#[case::zero_sessions(r#"{ "pool": { "sessions": 0 } }"#, "pool.sessions")]
#[case::zero_queue(r#"{ "pool": { "queue_capacity": 0 } }"#, "pool.queue_capacity")]
#[case::empty_command(r#"{ "engine": { "command": "" } }"#, "engine.command")]
fn invalid_values_are_rejected(temp_dir: TempDir, #[case] contents: &str, #[case] field: &str) {
    let path = write_config(&temp_dir, contents);

    let error = Config::load_from_path(&path).expect_err("load must fail");

    assert!(matches!(error, ConfigError::Invalid { .. }));
    assert!(
        error.to_string().contains(field),
        "expected {field} in message: {error}"
    );
}
