// ABOUTME: Integration tests for the kiln CLI commands.
// ABOUTME: Validates --help output, init behavior and argument errors.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

fn kiln_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("kiln"))
}

#[test]
fn help_shows_commands() {
    kiln_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("launch"))
        .stdout(predicate::str::contains("undeploy"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("cleanup"));
}

#[test]
fn init_creates_config_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("kiln.yml");

    kiln_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--namespace", "payments"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created kiln.yml"));

    assert!(config_path.exists(), "kiln.yml should be created");
    let content = fs::read_to_string(&config_path).unwrap();
    assert!(content.contains("namespace: payments"));
    assert!(content.contains("s2i_image: fabric8/s2i-java:latest-java11"));
    kiln::config::Config::from_yaml(&content).unwrap();
}

#[test]
fn init_refuses_to_overwrite_existing_config() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("kiln.yml");

    fs::write(&config_path, "api: {}").unwrap();

    kiln_cmd()
        .current_dir(temp_dir.path())
        .arg("init")
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));

    assert_eq!(fs::read_to_string(&config_path).unwrap(), "api: {}");
}

#[test]
fn init_force_overwrites() {
    let temp_dir = tempfile::tempdir().unwrap();
    let config_path = temp_dir.path().join("kiln.yml");
    fs::write(&config_path, "api: {}").unwrap();

    kiln_cmd()
        .current_dir(temp_dir.path())
        .args(["init", "--force"])
        .assert()
        .success();

    assert!(fs::read_to_string(&config_path).unwrap().contains("namespace: default"));
}

#[test]
fn deploy_without_config_fails() {
    let temp_dir = tempfile::tempdir().unwrap();

    kiln_cmd()
        .current_dir(temp_dir.path())
        .args(["deploy", "ticker", "file:/opt/apps/ticker.jar"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn json_errors_are_structured() {
    let temp_dir = tempfile::tempdir().unwrap();

    kiln_cmd()
        .current_dir(temp_dir.path())
        .args(["--json", "status", "ticker"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("\"event\":\"error\""))
        .stderr(predicate::str::contains("configuration file not found"));
}

#[test]
fn invalid_app_id_is_rejected_by_the_parser() {
    kiln_cmd()
        .args(["undeploy", "-ticker"])
        .assert()
        .failure();

    kiln_cmd()
        .args(["status", "Ticker_App"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid"));
}

#[test]
fn quiet_and_json_conflict() {
    kiln_cmd()
        .args(["--quiet", "--json", "status", "ticker"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be used with"));
}
