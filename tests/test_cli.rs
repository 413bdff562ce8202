use assert_cmd::prelude::*;
use predicates::prelude::*;

use std::path::PathBuf;
use std::process::Command;

fn data(name: &str) -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "tests", "data", name].iter().collect()
}

fn easysim(out: &str) -> Command {
    let mut cmd = Command::cargo_bin("easysim").expect("Calling binary failed");
    let dir: PathBuf = [env!("CARGO_MANIFEST_DIR"), "target", "cli-output", out].iter().collect();
    cmd.env("EASYSIM_OUTPUT_DIR", dir);
    cmd
}

#[test]
fn test_cli() {
    let mut cmd = Command::cargo_bin("easysim").expect("Calling binary failed");
    cmd.assert().failure();
}

#[test]
fn test_version() {
    let expected_version = "easysim 0.1.0\n";
    let mut cmd = Command::cargo_bin("easysim").expect("Calling binary failed");
    cmd.arg("--version").assert().stdout(expected_version);
}

#[test]
fn test_run_easy() {
    easysim("easy")
        .arg("-c")
        .arg(data("two_units.toml"))
        .arg("run")
        .assert()
        .success()
        .stdout(predicate::str::contains("jobs completed: 4"))
        .stdout(predicate::str::contains("jobs rejected: 1"))
        .stdout(predicate::str::contains("makespan: 15.00"));
}

#[test]
fn test_run_fcfs_preset() {
    easysim("fcfs")
        .arg("-c")
        .arg(data("two_units.toml"))
        .args(&["-p", "fcfs", "run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("makespan: 20.00"));
}

#[test]
fn test_run_writes_outputs() {
    let dir: PathBuf = [env!("CARGO_MANIFEST_DIR"), "target", "cli-output", "files"].iter().collect();
    easysim("files")
        .arg("-c")
        .arg(data("two_units.toml"))
        .arg("run")
        .assert()
        .success();
    assert!(dir.join("jobs.csv").is_file());
    assert!(dir.join("events.jsonl").is_file());
}

#[test]
fn test_env_override() {
    easysim("env")
        .arg("-c")
        .arg(data("two_units.toml"))
        .arg("config")
        .env("EASYSIM_SIM__POLICY", "fcfs")
        .assert()
        .success()
        .stdout(predicate::str::contains("policy: fcfs"));
}

#[test]
fn test_unknown_preset() {
    easysim("bad")
        .args(&["-p", "no-such-preset", "config"])
        .assert()
        .failure();
}
