//! Integration tests for the `ledcycle` binary.
//!
//! These exercise the CLI via `assert_cmd`. Nothing here needs GPIO
//! hardware: `run` is pointed at a chip path that does not exist.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn cli() -> assert_cmd::Command {
    cargo_bin_cmd!("ledcycle")
}

#[test]
fn cli_help_succeeds() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ledcycle"));
}

#[test]
fn cli_version_prints_version() {
    cli()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn cli_config_json_produces_valid_json() {
    let output = cli()
        .args(["config", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value =
        serde_json::from_slice(&output).expect("config --json should produce valid JSON");
    assert!(json["settings"].is_object());
    assert_eq!(json["settings"]["chip"], "/dev/gpiochip0");
    assert_eq!(json["settings"]["switch_pin"], 12);
    assert_eq!(json["settings"]["exit_pin"], 13);
    assert_eq!(json["settings"]["output_mode"], "push-pull");
    assert_eq!(json["valid"], true);
}

#[test]
fn cli_config_reports_duplicate_pin() {
    let output = cli()
        .args(["config", "--json", "--exit-pin", "12"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["valid"], false);
    assert!(json["error"].as_str().unwrap().contains("12"));
}

#[test]
fn cli_config_human_output() {
    cli()
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Chip:"))
        .stdout(predicate::str::contains("Switch button:"))
        .stdout(predicate::str::contains("Red LED:"))
        .stdout(predicate::str::contains("1 ms"));
}

// ── --verbose flag ──

#[test]
fn cli_verbose_flag_accepted() {
    cli().args(["-v", "config"]).assert().success();
}

#[test]
fn cli_verbose_long_flag_accepted() {
    cli().args(["config", "--verbose"]).assert().success();
}

// ── run ──

#[test]
fn cli_run_help_lists_pins() {
    cli()
        .args(["run", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--switch-pin"))
        .stdout(predicate::str::contains("--period-ms"));
}

#[test]
fn cli_run_missing_chip_logs_and_exits_zero() {
    cli()
        .args(["run", "--chip", "/nonexistent/gpiochip99"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Starting application"))
        .stderr(predicate::str::contains("Application exiting"));
}

#[test]
fn cli_run_rejects_bad_output_mode() {
    cli()
        .args(["run", "--output-mode", "tristate"])
        .assert()
        .failure();
}

#[test]
fn cli_unknown_subcommand_fails() {
    cli().arg("blink").assert().failure();
}
