//! Runs the `casegen` binary against a scratch study directory.
#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Mutex, MutexGuard, PoisonError};

const MACRO: &str = "// CaseName\nvelocity = VelocityToReplace;\nsave(\"SavePath\");\n";

/// Fails unless the macro's save target is absolute and its directory exists.
const SAVE_PATH_CHECK: &str = r#"#!/bin/sh
while [ $# -gt 0 ] && [ "$1" != "-batch" ]; do shift; done
save=$(sed -n 's/.*save("\(.*\)");.*/\1/p' "$2")
case "$save" in
  /*) ;;
  *) echo "relative save path: $save" >&2; exit 1 ;;
esac
test -d "$(dirname "$save")"
"#;

// Writing an executable while another test forks can fail with ETXTBSY.
static PROCESS_LOCK: Mutex<()> = Mutex::new(());

fn lock() -> MutexGuard<'static, ()> {
    PROCESS_LOCK.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_study(dir: &Path, program: &str, plan: &str) {
    let config = format!(
        r#"
[settings]
placeholders = ["VelocityToReplace"]
output_path = "cases"
max_concurrency = 2

[param_mapping]
VelocityToReplace = "Velocity"

[builder]
program = "{program}"
"#
    );
    std::fs::write(dir.join("casegen.toml"), config).expect("config");
    std::fs::write(dir.join("CasePlan.csv"), plan).expect("plan");
    std::fs::write(dir.join("template_Macro.java"), MACRO).expect("macro");
    std::fs::write(dir.join("template_Case.sim"), b"sim").expect("sim");
}

fn write_script(dir: &Path, body: &str) -> PathBuf {
    let _lock = lock();
    let script = dir.join("fake-starccm.sh");
    std::fs::write(&script, body).expect("script");
    let mut permissions = std::fs::metadata(&script).expect("metadata").permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(&script, permissions).expect("chmod");
    script
}

fn casegen(dir: &Path, args: &[&str]) -> Output {
    let _lock = lock();
    Command::new(env!("CARGO_BIN_EXE_casegen"))
        .args(args)
        .arg("--config")
        .arg(dir.join("casegen.toml"))
        .env_remove("RUST_LOG")
        .output()
        .expect("run casegen")
}

/// Runs from inside `dir`, leaving the config path to the arguments.
fn casegen_in(dir: &Path, args: &[&str]) -> Output {
    let _lock = lock();
    Command::new(env!("CARGO_BIN_EXE_casegen"))
        .current_dir(dir)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run casegen")
}

#[test]
fn check_lists_planned_cases_without_writing() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_study(dir.path(), "true", "Velocity\n10\n20\n");

    let output = casegen(dir.path(), &["check"]);

    assert_eq!(output.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Case1"), "{stdout}");
    assert!(stdout.contains("Macro_Case2.java"), "{stdout}");
    assert!(!dir.path().join("cases").exists());
}

#[test]
fn check_reports_rejected_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_study(dir.path(), "true", "Velocity,Note\n10,a\n,b\n");

    let output = casegen(dir.path(), &["check"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stdout).contains("rejected"));
}

#[test]
fn run_succeeds_when_builder_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_study(dir.path(), "true", "Velocity\n10\n20\n");

    let output = casegen(dir.path(), &["run"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let cases = dir.path().join("cases");
    assert!(cases.join("Case1").join("Macro_Case1.java").is_file());
    assert!(cases.join("Case2").join("Case2.sim").is_file());
    assert!(cases.join("batch_report.json").is_file());
}

#[test]
fn run_uses_default_config_in_working_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_study(dir.path(), "true", "Velocity\n10\n20\n");

    let output = casegen_in(dir.path(), &["run", "--no-report"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let cases = dir.path().join("cases");
    assert!(cases.join("Case1").join("Macro_Case1.java").is_file());
    assert!(cases.join("Case2").join("Case2.sim").is_file());
}

#[test]
fn builder_sees_absolute_save_path_with_relative_config() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = write_script(dir.path(), SAVE_PATH_CHECK);
    write_study(dir.path(), &script.to_string_lossy(), "Velocity\n10\n20\n");

    let output = casegen_in(dir.path(), &["run", "--config", "./casegen.toml", "--no-report"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    let macro_text = std::fs::read_to_string(
        dir.path().join("cases").join("Case1").join("Macro_Case1.java"),
    )
    .expect("macro");
    assert!(!macro_text.contains("save(\"./"), "{macro_text}");
}

#[test]
fn relative_output_override_is_anchored_at_working_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = write_script(dir.path(), SAVE_PATH_CHECK);
    write_study(dir.path(), &script.to_string_lossy(), "Velocity\n10\n");

    let output = casegen_in(dir.path(), &["run", "--output-dir", "elsewhere", "--no-report"]);

    assert_eq!(output.status.code(), Some(0), "{output:?}");
    assert!(dir.path().join("elsewhere").join("Case1").join("Case1.log").is_file());
}

#[test]
fn run_exits_one_when_cases_fail() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_study(dir.path(), "false", "Velocity\n10\n20\n");

    let output = casegen(dir.path(), &["run", "--no-report"]);

    assert_eq!(output.status.code(), Some(1), "{output:?}");
    assert!(!dir.path().join("cases").join("batch_report.json").exists());
    assert!(String::from_utf8_lossy(&output.stdout).contains("FAILED"));
}

#[test]
fn run_exits_two_when_aborted() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_study(dir.path(), "false", "Velocity\n10\n20\n30\n");

    let output = casegen(
        dir.path(),
        &["run", "--abort-on-error", "--max-concurrency", "1"],
    );

    assert_eq!(output.status.code(), Some(2), "{output:?}");
}

#[test]
fn missing_config_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");

    let output = casegen(dir.path(), &["run"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stderr).contains("error:"));
}

#[test]
fn zero_concurrency_override_is_fatal() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_study(dir.path(), "true", "Velocity\n10\n");

    let output = casegen(dir.path(), &["run", "--max-concurrency", "0"]);

    assert_eq!(output.status.code(), Some(3));
    assert!(!dir.path().join("cases").exists());
}
