//! End-to-end tests for the `buildrt` binary
//!
//! Each test runs the real binary with an isolated XDG config directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn bin(config_home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("buildrt"));
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("XDG_CONFIG_DIRS", config_home.path().join("system"))
        .env_remove("BUILDRT_CONFIG")
        .env_remove("BUILDRT_LOG")
        .env_remove("BUILDRT_JENKINS_BUILD");
    cmd
}

// =============================================================================
// Fatal path
// =============================================================================

#[test]
fn test_fail_exits_with_default_code() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["fail", "compiler", "missing"])
        .assert()
        .code(3)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Fatal error: compiler missing"));
}

#[test]
fn test_fail_custom_code_context_and_fixit() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args([
            "fail",
            "no",
            "cc",
            "--context",
            "building qemu",
            "--fixit",
            "install clang",
            "--exit-code",
            "9",
        ])
        .assert()
        .code(9)
        .stderr(predicate::str::contains("Fatal error building qemu: no cc"))
        .stderr(predicate::str::contains("Possible solution: install clang"));
}

#[test]
fn test_fail_in_pretend_mode_continues() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["--pretend", "fail", "would", "break"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Potential fatal error: would break"));
}

#[test]
fn test_fail_when_pretending_exits() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["-p", "fail", "cannot", "simulate", "--fatal-when-pretending"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Potential fatal error: cannot simulate"));
}

#[test]
fn test_fail_separator_override() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["fail", "a", "b", "--sep", ","])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("Fatal error:,a,b"));
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_config_file_enables_pretend() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("buildrt");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "pretend = true\n").unwrap();

    bin(&home)
        .args(["fail", "from", "file"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Potential fatal error: from file"));
}

#[test]
fn test_explicit_config_path() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("custom.toml");
    fs::write(&path, "force = true\n").unwrap();

    bin(&home)
        .arg("--config")
        .arg(&path)
        .args(["confirm", "Proceed?", "--force-answer", "false"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Proceed? y/[N] n"));
}

#[test]
fn test_verbose_and_quiet_in_file_rejected() {
    let home = TempDir::new().unwrap();
    let dir = home.path().join("buildrt");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "verbose = true\nquiet = true\n").unwrap();

    bin(&home)
        .arg("net")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("mutually exclusive"));
}

#[test]
fn test_verbose_and_quiet_flags_conflict() {
    let home = TempDir::new().unwrap();
    bin(&home).args(["-v", "-q", "net"]).assert().failure();
}

#[test]
fn test_invalid_config_reports_path() {
    let home = TempDir::new().unwrap();
    let path = home.path().join("broken.toml");
    fs::write(&path, "pretend = \n").unwrap();

    bin(&home)
        .arg("--config")
        .arg(&path)
        .arg("net")
        .assert()
        .code(3)
        .stderr(predicate::str::contains("broken.toml"));
}

// =============================================================================
// Commands
// =============================================================================

#[test]
fn test_confirm_without_terminal_returns_default() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["confirm", "Continue?", "--default-yes"])
        .write_stdin("n\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    bin(&home)
        .args(["confirm", "Continue?"])
        .assert()
        .code(1);
}

#[test]
fn test_confirm_pretend_auto_answers() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["--pretend", "confirm", "Delete build dir?"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Delete build dir? y/[N] y"));
}

#[test]
fn test_net_presumed() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["--presume-connectivity", "net"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Internet connection: reachable"));
}

#[test]
fn test_doctor_reports_host_facts() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args(["--presume-connectivity", "--pretend", "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Inspecting host..."))
        .stdout(predicate::str::contains("Internet connection: reachable"))
        .stdout(predicate::str::contains("Make jobs:"))
        .stdout(predicate::str::contains("not checked (pretend)"));
}

#[test]
fn test_doctor_detects_jenkins_by_presence() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .env("BUILDRT_JENKINS_BUILD", "")
        .args(["--presume-connectivity", "--pretend", "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jenkins build: true"));

    bin(&home)
        .args(["--presume-connectivity", "--pretend", "doctor"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Jenkins build: false"));
}

#[test]
fn test_install_hint_with_target() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .args([
            "install-hint",
            "ninja",
            "--package",
            "ninja-build",
            "--target",
            "ninja",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("`buildrt ninja` to install locally."));
}

#[test]
fn test_free_port_prints_port() {
    let home = TempDir::new().unwrap();
    bin(&home)
        .arg("free-port")
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^\d+\n$").unwrap());
}
