// tests/cli.rs
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

fn safefork() -> Command {
    let mut cmd = Command::cargo_bin("safefork").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("SAFEFORK_SYSLOG_PATH");
    cmd
}

#[test]
fn help_exits_zero() {
    safefork().arg("--help").assert().success();
}

#[test]
fn fresh_process_is_unsafe_only_on_freeze() {
    safefork()
        .arg("check")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("threads    safe\n"))
        .stdout(predicate::str::contains("signals    safe\n"))
        .stdout(predicate::str::contains("scheduler  safe\n"))
        .stdout(predicate::str::contains(
            "freeze     unsafe\n           freeze count is zero\n",
        ))
        .stdout(predicate::str::ends_with("unsafe to fork\n"))
        .stderr(predicate::str::contains(
            "safefork: warning: allocator not frozen",
        ));
}

#[test]
fn frozen_fresh_process_is_safe() {
    safefork()
        .args(["check", "--freeze"])
        .assert()
        .success()
        .stdout(predicate::str::ends_with("safe to fork\n"))
        .stdout(predicate::str::contains("unsafe").not())
        .stderr("");
}

#[test]
fn json_report() {
    let out = safefork()
        .args(["check", "--format", "json"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(report["safe"], false);
    let verdicts = report["verdicts"].as_array().unwrap();
    let checks: Vec<_> = verdicts.iter().map(|v| v["check"].clone()).collect();
    assert_eq!(checks, ["threads", "signals", "scheduler", "freeze"]);
    assert_eq!(verdicts[3]["safe"], false);
    assert_eq!(verdicts[3]["diagnostics"][0]["kind"], "not_frozen");
}

#[test]
fn quiet_suppresses_warnings() {
    safefork()
        .args(["-q", "check"])
        .assert()
        .code(1)
        .stderr("");
}

#[test]
fn debug_flag_traces_one_check() {
    safefork()
        .args(["check", "--freeze", "--debug", "threads"])
        .assert()
        .success()
        .stderr(predicate::str::contains("safefork: debug: safe"));
}

#[test]
fn log_file_records_warnings() {
    let dir = tempdir().unwrap();
    let log = dir.path().join("check.log");
    safefork()
        .args(["check", "--log-file-format", "json", "--log-file"])
        .arg(&log)
        .assert()
        .code(1);
    let contents = fs::read_to_string(&log).unwrap();
    let records: Vec<Value> = contents
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert!(records.iter().any(|r| r["target"] == "safefork::freeze"
        && r["level"] == "WARN"
        && r["message"] == "freeze count is zero"));
}

#[cfg(unix)]
#[test]
fn exec_runs_command_when_safe() {
    safefork()
        .args(["exec", "--freeze", "--", "true"])
        .assert()
        .success();
}

#[cfg(unix)]
#[test]
fn exec_propagates_exit_status() {
    safefork()
        .args(["exec", "--freeze", "--", "sh", "-c", "echo child; exit 7"])
        .assert()
        .code(7)
        .stdout("child\n");
}

#[cfg(unix)]
#[test]
fn exec_reports_fork_in_verbose_mode() {
    safefork()
        .args(["-v", "exec", "--freeze", "--", "true"])
        .assert()
        .success()
        .stderr(predicate::str::contains("safefork: forked child="));
}

#[cfg(unix)]
#[test]
fn exec_refuses_when_unsafe() {
    safefork()
        .args(["exec", "--", "sh", "-c", "echo should-not-run"])
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("unsafe to fork"));
}

#[cfg(unix)]
#[test]
fn exec_missing_command_exits_127() {
    safefork()
        .args(["exec", "--freeze", "--", "/nonexistent/safefork-test-binary"])
        .assert()
        .code(127)
        .stdout("")
        .stderr(predicate::str::contains("exec failed"));
}

#[test]
fn demos_show_hazard_and_remediation() {
    for (hazard, diagnostic) in [
        ("threads", "thread lock-holder"),
        ("signals", "pending signal SIGUSR1"),
        ("scheduler", "tokio current_thread scheduler active"),
        ("freeze", "freeze count is zero"),
    ] {
        safefork()
            .args(["demo", hazard])
            .assert()
            .success()
            .stdout(predicate::str::contains(format!("with {hazard} hazard:")))
            .stdout(predicate::str::contains(diagnostic))
            .stdout(predicate::str::ends_with("after remediation:\nthreads    safe\nsignals    safe\nscheduler  safe\nfreeze     safe\nsafe to fork\n"));
    }
}

#[test]
fn unknown_hazard_is_usage_error() {
    safefork().args(["demo", "gc"]).assert().code(2);
}
