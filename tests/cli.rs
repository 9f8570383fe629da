//! CLI smoke tests

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(base_url: Option<&str>) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    let mut config = serde_json::json!({
        "api_key": "key",
        "api_secret": "secret",
        "default_start_datetime": "2023-01-01 00:00:00",
    });
    if let Some(url) = base_url {
        config["base_url"] = serde_json::json!(url);
    }
    write!(file, "{config}").unwrap();
    file
}

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("tap-shipstation")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("discover"));
}

#[test]
fn test_discover_prints_catalog() {
    let config = write_config(None);

    let output = Command::cargo_bin("tap-shipstation")
        .unwrap()
        .args(["discover", "--config", config.path().to_str().unwrap()])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let catalog: serde_json::Value = serde_json::from_slice(&output).unwrap();
    let streams = catalog["streams"].as_array().unwrap();
    assert_eq!(streams.len(), 3);
    let ids: Vec<&str> = streams
        .iter()
        .map(|s| s["tap_stream_id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"orders"));
    assert!(ids.contains(&"shipments"));
    assert!(ids.contains(&"stores"));
}

#[test]
fn test_discover_rejects_missing_config() {
    Command::cargo_bin("tap-shipstation")
        .unwrap()
        .args(["discover", "--config", "/nonexistent/config.json"])
        .assert()
        .failure();
}

#[test]
fn test_discover_rejects_invalid_timestamp() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"api_key":"k","api_secret":"s","default_start_datetime":"not a date"}}"#
    )
    .unwrap();

    Command::cargo_bin("tap-shipstation")
        .unwrap()
        .args(["discover", "--config", file.path().to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn test_sync_fails_fast_on_unreachable_api() {
    // Port 1 is never listening; the network error is fatal, not retried.
    let config = write_config(Some("http://127.0.0.1:1"));

    Command::cargo_bin("tap-shipstation")
        .unwrap()
        .args(["sync", "--config", config.path().to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn test_sync_requires_config_argument() {
    Command::cargo_bin("tap-shipstation")
        .unwrap()
        .arg("sync")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--config"));
}
