//! Smoke tests for the swagprobe CLI
//!
//! These run the real binary; suite runs use `--simulate` so no browser is
//! needed.

#![allow(deprecated)] // Command::cargo_bin
#![allow(clippy::expect_used, clippy::unwrap_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Get a command for the swagprobe binary, isolated from the caller's env
fn swagprobe() -> Command {
    let mut cmd = Command::cargo_bin("swagprobe").expect("swagprobe binary should exist");
    for key in ["SWAGPROBE_CONFIG", "SWAGPROBE_BROWSER", "SWAGPROBE_LOG", "SWAGPROBE_SEED"] {
        cmd.env_remove(key);
    }
    cmd
}

// ============================================================================
// Basic CLI Tests
// ============================================================================

#[test]
fn test_version_flag() {
    swagprobe()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_help_flag() {
    swagprobe()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Swag Labs"))
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("repeat"));
}

#[test]
fn test_no_args_fails() {
    swagprobe().assert().failure();
}

#[test]
fn test_run_help_lists_session_flags() {
    swagprobe()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--browser"))
        .stdout(predicate::str::contains("--alluredir"))
        .stdout(predicate::str::contains("--simulate"));
}

// ============================================================================
// list
// ============================================================================

#[test]
fn test_list_shows_cases() {
    swagprobe()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("login[standard_user]"))
        .stdout(predicate::str::contains("login[locked_out_user]"))
        .stdout(predicate::str::contains("end_to_end"));
}

#[test]
fn test_list_json_filtered() {
    let output = swagprobe()
        .args(["list", "--filter", "checkout", "--format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let cases: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let ids: Vec<&str> = cases
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["checkout_step_one", "checkout_step_two"]);
}

// ============================================================================
// run
// ============================================================================

#[test]
fn test_run_simulated_login_cases() {
    let temp = TempDir::new().unwrap();
    swagprobe()
        .current_dir(temp.path())
        .args(["run", "--simulate", "--filter", "login[standard", "--color", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("PASSED"));
    let results = fs::read_dir(temp.path().join("allure-results")).unwrap().count();
    assert!(results >= 1);
}

#[test]
fn test_run_unknown_filter_is_usage_error() {
    swagprobe()
        .args(["run", "--simulate", "--filter", "no-such-case"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no case matches"));
}

#[test]
fn test_run_rejects_firefox() {
    swagprobe()
        .args(["run", "--simulate", "--browser", "firefox"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("firefox"));
}

#[test]
fn test_run_reads_config_file() {
    let temp = TempDir::new().unwrap();
    let config = temp.path().join("swagprobe.yaml");
    fs::write(&config, "results_dir: out/results\nscreenshots_dir: out/shots\nseed: 3\n").unwrap();
    swagprobe()
        .current_dir(temp.path())
        .args(["run", "--simulate", "--filter", "cart", "-q", "--config"])
        .arg(&config)
        .assert()
        .success();
    assert!(temp.path().join("out/results").is_dir());
    assert!(temp.path().join("out/shots").is_dir());
    assert!(!temp.path().join("allure-results").exists());
}

// ============================================================================
// repeat
// ============================================================================

#[test]
fn test_repeat_prints_statistics() {
    let temp = TempDir::new().unwrap();
    swagprobe()
        .current_dir(temp.path())
        .args(["repeat", "inventory", "-n", "2", "--simulate", "--no-report", "--color", "never"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Success rate: 100.00%"))
        .stderr(predicate::str::contains("StdDev"));
    let logs: Vec<_> = fs::read_dir(temp.path().join("logs"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(logs.len(), 1);
    assert!(logs[0].starts_with("inventory_"));
}

#[test]
fn test_repeat_with_failed_runs_exits_nonzero() {
    let temp = TempDir::new().unwrap();
    swagprobe()
        .current_dir(temp.path())
        .args([
            "repeat",
            "login[performance_glitch_user]",
            "-n",
            "2",
            "--simulate",
            "--timeout-ms",
            "1",
            "--no-report",
            "--color",
            "never",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("0 passed, 2 failed"));
}

#[test]
fn test_repeat_unknown_case() {
    swagprobe()
        .args(["repeat", "nope", "--simulate"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("unknown case"));
}

// ============================================================================
// clean
// ============================================================================

#[test]
fn test_clean_removes_outputs() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("allure-results/chrome")).unwrap();
    fs::create_dir_all(temp.path().join("screenshots/chrome")).unwrap();
    fs::create_dir_all(temp.path().join("logs")).unwrap();

    swagprobe()
        .current_dir(temp.path())
        .args(["clean", "--dry-run"])
        .assert()
        .success();
    assert!(temp.path().join("logs").exists());

    swagprobe()
        .current_dir(temp.path())
        .arg("clean")
        .assert()
        .success();
    assert!(!temp.path().join("allure-results").exists());
    assert!(!temp.path().join("screenshots").exists());
    assert!(!temp.path().join("logs").exists());
}

#[test]
fn test_clean_refuses_parent_dir() {
    swagprobe()
        .args(["clean", "--logs-dir", ".."])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("refusing"));
}
