#![allow(deprecated)] // TODO: move to cargo_bin_cmd! once assert_cmd drops cargo_bin

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn speedyflow(storage: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("speedyflow").unwrap();
    cmd.env_remove("SPEED_CLOUD_API_KEY")
        .env_remove("SPEED_CLOUD_API_SECRET")
        .env_remove("SPEED_CLOUD_KEYPAIR_NAME")
        .env_remove("SPEED_CLOUD_IP_TYPE")
        .arg("--storage-path")
        .arg(storage.path());
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("speedyflow").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("start"))
        .stdout(predicate::str::contains("stop"))
        .stdout(predicate::str::contains("rm"))
        .stdout(predicate::str::contains("ip"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("speedyflow").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("speedyflow"));
}

#[test]
fn test_invalid_command() {
    let mut cmd = Command::cargo_bin("speedyflow").unwrap();
    cmd.arg("invalid-command").assert().failure();
}

#[test]
fn test_create_without_credentials_fails() {
    let storage = TempDir::new().unwrap();
    speedyflow(&storage)
        .args(["create", "host1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be specified"))
        .stderr(predicate::str::contains("SPEED_CLOUD_API_KEY"));
}

#[test]
fn test_create_rejects_unknown_ip_type() {
    let storage = TempDir::new().unwrap();
    speedyflow(&storage)
        .args([
            "--speedycloud-api-key",
            "key",
            "--speedycloud-api-secret",
            "secret",
            "--speedycloud-ip-type",
            "both",
            "create",
            "host1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--speedycloud-ip-type"));
}

#[test]
fn test_create_rejects_path_like_names() {
    let storage = TempDir::new().unwrap();
    let outside = TempDir::new().unwrap();
    let target = outside.path().to_string_lossy().into_owned();

    for name in ["../escape", "a/b", target.as_str()] {
        speedyflow(&storage)
            .args([
                "--speedycloud-api-key",
                "key",
                "--speedycloud-api-secret",
                "secret",
                "create",
                name,
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("invalid machine name"));
    }

    assert!(std::fs::read_dir(outside.path()).unwrap().next().is_none());
    assert!(!storage.path().join("escape").exists());
}

#[test]
fn test_ip_of_unknown_machine() {
    let storage = TempDir::new().unwrap();
    speedyflow(&storage)
        .args([
            "--speedycloud-api-key",
            "key",
            "--speedycloud-api-secret",
            "secret",
            "ip",
            "ghost",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_ls_empty_storage() {
    let storage = TempDir::new().unwrap();
    speedyflow(&storage)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("No machines"));
}

#[test]
fn test_inspect_prints_record() {
    let storage = TempDir::new().unwrap();
    let dir = storage.path().join("machines").join("host1");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(
        dir.join("machine.json"),
        r#"{
  "version": 1,
  "name": "host1",
  "instance_id": "srv-42",
  "ip_address": "203.0.113.9",
  "key_pair_name": "host1-abc",
  "key_pair_generated": true,
  "address_class": "external",
  "ssh_user": "root",
  "ssh_port": 22,
  "created_at": "2026-01-01T00:00:00Z",
  "updated_at": "2026-01-01T00:00:00Z"
}"#,
    )
    .unwrap();

    speedyflow(&storage)
        .args(["inspect", "host1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("srv-42"));

    speedyflow(&storage)
        .arg("ls")
        .assert()
        .success()
        .stdout(predicate::str::contains("host1"))
        .stdout(predicate::str::contains("203.0.113.9"));
}
