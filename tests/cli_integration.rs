//! CLI integration tests
//!
//! Runs the `wallapop-adjust` binary against an isolated session directory.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::TempDir;

/// A command whose config and session live under `dir`
fn isolated(dir: &TempDir) -> assert_cmd::Command {
    let mut cmd = cargo_bin_cmd!("wallapop-adjust");
    cmd.env("HOME", dir.path())
        .env("XDG_CONFIG_HOME", dir.path().join("config"))
        .env("WALLAPOP_SESSION_DIR", dir.path().join("session"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("wallapop-adjust");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("wallapop-auto-adjust"))
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("wallapop-adjust");
    cmd.arg("--help");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("login"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("configure"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("reset"));
}

#[test]
fn test_run_help_shows_dry_run() {
    let mut cmd = cargo_bin_cmd!("wallapop-adjust");
    cmd.args(["run", "--help"]);

    cmd.assert().success().stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn test_status_without_session() {
    let dir = TempDir::new().unwrap();

    isolated(&dir)
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session: none"))
        .stdout(predicate::str::contains("Products: 0 tracked"));
}

#[test]
fn test_reset_without_session() {
    let dir = TempDir::new().unwrap();

    isolated(&dir)
        .arg("reset")
        .assert()
        .success()
        .stdout(predicate::str::contains("Session cleared"));
}

#[test]
fn test_run_without_session_fails() {
    let dir = TempDir::new().unwrap();

    isolated(&dir)
        .args(["run", "--dry-run"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("login"))
        .stderr(predicate::str::contains("cookie validation"));
}

#[test]
fn test_login_with_incomplete_cookie_file_fails() {
    let dir = TempDir::new().unwrap();
    let cookies = dir.path().join("cookies.txt");
    std::fs::write(&cookies, "__Secure-next-auth.session-token=only-session").unwrap();

    isolated(&dir)
        .args(["login", "--cookies"])
        .arg(&cookies)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Failed during cookie validation"));

    assert!(!dir.path().join("session").join("session_data.json").exists());
}

#[test]
fn test_invalid_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let config = dir.path().join("config.toml");
    std::fs::write(&config, "[network]\ntimeout_secs = 0\n").unwrap();

    isolated(&dir)
        .args(["status", "--config"])
        .arg(&config)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("timeout_secs"));
}
