use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn prints_help() {
    Command::cargo_bin("cohost").unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--status-addr"));
}

#[test]
fn prints_version() {
    Command::cargo_bin("cohost").unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn missing_config_file_is_fatal() {
    Command::cargo_bin("cohost").unwrap()
        .args(["--config", "/nonexistent/cohost.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cohost.toml"));
}

#[test]
fn unknown_job_override_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let data = dir.path().join("data");
    std::fs::write(
        &path,
        format!("data_dir = {:?}\n\n[scheduler.jobs.dance_party]\npriority = 1\n", data.display().to_string()),
    )
    .unwrap();

    Command::cargo_bin("cohost").unwrap()
        .args(["--config", path.to_str().unwrap(), "--log", "warn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("dance_party"));
}
