//! Integration tests for the `travel-analytics` binary.

use std::path::Path;
use std::process::{Command, Output};

/// Run the CLI with an isolated (missing) config file so user settings don't leak in.
fn run_cli(dir: &Path, args: &[&str]) -> Output {
    let config = dir.join("missing-config.toml");
    Command::new(env!("CARGO_BIN_EXE_travel-analytics"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .output()
        .expect("Failed to execute travel-analytics")
}

#[test]
fn test_help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["--help"]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("serve"));
    assert!(stdout.contains("init-db"));
    assert!(stdout.contains("config"));
}

#[test]
fn test_init_db_creates_and_seeds_once() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("data").join("travel.db");
    let db_arg = db.to_string_lossy().to_string();

    let output = run_cli(dir.path(), &["init-db", "--database", &db_arg]);
    assert!(
        output.status.success(),
        "init-db failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(db.exists());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sample flights added: 2"), "{stdout}");

    let output = run_cli(dir.path(), &["init-db", "--database", &db_arg]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Sample flights added: 0"), "{stdout}");
    assert!(stdout.contains("Flights stored:       2"), "{stdout}");
}

#[test]
fn test_init_db_without_seed() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("empty.db");

    let output = run_cli(
        dir.path(),
        &["init-db", "--database", &db.to_string_lossy(), "--no-seed"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Flights stored:       0"), "{stdout}");
}

#[test]
fn test_config_show_json() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_cli(dir.path(), &["config", "show", "--json"]);
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["weather"]["cache_ttl_secs"], 3600);
    assert_eq!(value["server"]["bind"], "127.0.0.1:5000");
}

#[test]
fn test_invalid_config_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.toml");
    std::fs::write(&config, "[weather]\ncache_ttl_secs = 0\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_travel-analytics"))
        .arg("--config")
        .arg(&config)
        .args(["config", "show"])
        .output()
        .expect("Failed to execute travel-analytics");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cache_ttl_secs"), "{stderr}");
}

#[test]
fn test_config_file_settings_apply() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("travel.toml");
    std::fs::write(
        &config,
        "[server]\nbind = \"0.0.0.0:8080\"\n\n[weather]\ncache_ttl_secs = 60\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_travel-analytics"))
        .arg("--config")
        .arg(&config)
        .args(["config", "show", "--json"])
        .output()
        .expect("Failed to execute travel-analytics");
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["server"]["bind"], "0.0.0.0:8080");
    assert_eq!(value["weather"]["cache_ttl_secs"], 60);
    assert_eq!(value["storage"]["seed_sample_data"], true);
}

#[test]
fn test_config_validate_rejects_file() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "[weather]\ncache_ttl_secs = 0\n").unwrap();

    let output = run_cli(
        dir.path(),
        &["config", "validate", "--file", &bad.to_string_lossy()],
    );
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cache_ttl_secs"), "{stderr}");
}
