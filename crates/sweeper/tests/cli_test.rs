#![allow(deprecated)] // TODO: migrate Command::cargo_bin to the cargo_bin_cmd! macro

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;

const SWEEPER_ENV: &[&str] = &[
    "SWEEPER_CONFIG",
    "SWEEPER_PROJECT",
    "SWEEPER_MAX_AGE_HOURS",
    "SWEEPER_LABEL_KEY",
    "SWEEPER_LABEL_VALUE",
    "SWEEPER_REGIONS",
    "SWEEPER_ZONES",
    "SWEEPER_TYPES",
    "SWEEPER_CONCURRENCY",
    "SWEEPER_TIMEOUT_SECS",
    "SWEEPER_LIST_TIMEOUT_SECS",
    "SWEEPER_LOG_FORMAT",
    "SWEEPER_AUTH",
    "SWEEPER_DRY_RUN",
    "SWEEPER_SCHEDULE_AT",
    "SWEEPER_SUBSCRIPTION",
];

/// Binary with a clean environment and an empty config file
fn sweeper(config_dir: &tempfile::TempDir) -> Command {
    let config = config_dir.path().join("sweeper.yaml");
    fs::write(&config, "").unwrap();

    let mut cmd = Command::cargo_bin("sweeper").unwrap();
    for var in SWEEPER_ENV {
        cmd.env_remove(var);
    }
    cmd.env("SWEEPER_CONFIG", &config);
    cmd
}

#[test]
fn test_cli_help() {
    let mut cmd = Command::cargo_bin("sweeper").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("stale"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("schedule"))
        .stdout(predicate::str::contains("listen"))
        .stdout(predicate::str::contains("types"));
}

#[test]
fn test_cli_version() {
    let mut cmd = Command::cargo_bin("sweeper").unwrap();
    cmd.arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("sweeper"));
}

#[test]
fn test_run_help_lists_flags() {
    let mut cmd = Command::cargo_bin("sweeper").unwrap();
    cmd.args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"))
        .stdout(predicate::str::contains("--json"))
        .stdout(predicate::str::contains("--fail-on-error"))
        .stdout(predicate::str::contains("--max-age-hours"));
}

#[test]
fn test_types_lists_every_resource_type() {
    let mut cmd = Command::cargo_bin("sweeper").unwrap();
    cmd.arg("types")
        .assert()
        .success()
        .stdout(predicate::str::contains("composer-environment"))
        .stdout(predicate::str::contains("gke-cluster"))
        .stdout(predicate::str::contains("compute-instance"))
        .stdout(predicate::str::contains("compute-disk"))
        .stdout(predicate::str::contains("dataproc-cluster"))
        .stdout(predicate::str::contains("redis-instance"));
}

#[test]
fn test_schedule_rejects_bad_time() {
    let mut cmd = Command::cargo_bin("sweeper").unwrap();
    cmd.env_remove("SWEEPER_SCHEDULE_AT")
        .args(["schedule", "--at", "25:00"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("HH:MM"));
}

#[test]
fn test_listen_requires_subscription() {
    let mut cmd = Command::cargo_bin("sweeper").unwrap();
    cmd.env_remove("SWEEPER_SUBSCRIPTION")
        .arg("listen")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--subscription"));
}

#[test]
fn test_zero_max_age_rejected() {
    let dir = tempfile::tempdir().unwrap();
    sweeper(&dir)
        .args(["run", "--max-age-hours", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_age_hours must be greater than 0"));
}

#[test]
fn test_out_of_range_max_age_rejected() {
    let dir = tempfile::tempdir().unwrap();
    sweeper(&dir)
        .args(["run", "--max-age-hours", "18446744073709551615"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_file_log_format_accepted_by_schema() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("json.yaml");
    fs::write(&config, "log_format: json\ndry_run: true\nmax_age_hours: 0\n").unwrap();

    // Fails on validation, not on unknown fields
    sweeper(&dir)
        .env("SWEEPER_CONFIG", &config)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("max_age_hours must be greater than 0"));
}

#[test]
fn test_unknown_type_rejected() {
    let dir = tempfile::tempdir().unwrap();
    sweeper(&dir)
        .args(["run", "--only", "bucket"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown resource type: bucket"));
}

#[test]
fn test_unknown_auth_method_rejected() {
    let dir = tempfile::tempdir().unwrap();
    sweeper(&dir)
        .env("SWEEPER_AUTH", "kerberos")
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown auth method"));
}

#[test]
fn test_missing_config_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    sweeper(&dir)
        .env("SWEEPER_CONFIG", dir.path().join("missing.yaml"))
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Config file not found"));
}

#[test]
fn test_malformed_config_file_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let bad = dir.path().join("bad.yaml");
    fs::write(&bad, "concurrency: [not, a, number]\n").unwrap();

    sweeper(&dir)
        .env("SWEEPER_CONFIG", &bad)
        .arg("run")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse"));
}
