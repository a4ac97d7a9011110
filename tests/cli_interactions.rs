//! CLI options interaction tests
//!
//! These run the `nst` binary without touching the network: either they
//! stop before a run or they force the offline path.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;
use tempfile::TempDir;

/// Command running in an empty directory so no stray .env is picked up
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("nst").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("UPLOAD_URL")
        .env_remove("PROBE_METHOD")
        .env_remove("ENABLE_COLOR")
        .env("NO_COLOR", "1");
    cmd
}

/// Temp directory holding a .env with `content`
fn create_temp_config(content: &str) -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join(".env"), content).unwrap();
    temp_dir
}

#[test]
fn test_list_services() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--list-services")
        .arg("--no-color")
        .assert()
        .success()
        .stdout(predicate::str::contains("Available services:"))
        .stdout(predicate::str::contains("YouTube"))
        .stdout(predicate::str::contains("googlevideo.com"));
}

#[test]
fn test_mode_is_required() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Must specify one of --service, --domain or --general"));
}

#[test]
fn test_modes_are_mutually_exclusive() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--general", "--service", "YouTube"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("mutually exclusive"));

    create_test_cmd(&dir)
        .args(["--general", "--from-service"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--from-service"));
}

#[test]
fn test_invalid_option_values_rejected() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--general", "--probe-method", "icmp"])
        .assert()
        .failure();

    create_test_cmd(&dir)
        .args(["--general", "--probe-port", "0"])
        .assert()
        .failure();
}

#[test]
fn test_unknown_service_is_a_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--service", "Myspace", "--assume-offline"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Myspace"));
}

#[test]
fn test_offline_general_run_json() {
    let dir = TempDir::new().unwrap();
    let output = create_test_cmd(&dir)
        .args(["--general", "--assume-offline", "--json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["ping_ms"], -1);
    assert_eq!(report["jitter_ms"], -1);
    assert_eq!(report["download_mbps"], 0.0);
    assert_eq!(report["network_available"], false);
    assert_eq!(report["mode"], "General");
}

#[test]
fn test_offline_content_run_text() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--service", "TikTok", "--assume-offline", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ERROR: No network connection available!"))
        .stdout(predicate::str::contains("Test Type: TikTok"))
        .stdout(predicate::str::contains("Very Poor"));
}

#[test]
fn test_env_file_is_validated() {
    let dir = create_temp_config("UPLOAD_URL=ftp://example.com/upload\n");
    create_test_cmd(&dir)
        .args(["--general", "--assume-offline"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("upload URL must use http or https"));
}
