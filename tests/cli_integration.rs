//! Purpose: End-to-end checks for the `radosbind` binary.
//! Exports: Integration tests only.
//! Role: Run the built CLI and inspect stdout JSON, stderr error JSON, and exit codes.
//! Invariants: Failures print one JSON error line on stderr when stderr is not a TTY.
//! Notes: Runs without a reachable cluster, so probe only asserts the failure shape.
use std::io::Write;
use std::process::Command;

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_radosbind");
    Command::new(exe)
}

fn parse_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("valid json")
}

fn parse_stderr_error(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    let line = text
        .lines()
        .find(|line| line.starts_with('{'))
        .expect("json error line");
    serde_json::from_str(line).expect("valid json")
}

#[test]
fn version_reports_three_non_negative_numbers() {
    let output = cmd().arg("version").output().expect("version");
    assert!(output.status.success());
    let value = parse_json(&output.stdout);
    for field in ["major", "minor", "extra"] {
        let number = value["librados"][field].as_i64().expect(field);
        assert!(number >= 0);
    }
    assert_eq!(value["binding"], env!("CARGO_PKG_VERSION"));

    let again = parse_json(&cmd().arg("version").output().expect("version").stdout);
    assert_eq!(value, again);
}

#[test]
fn probe_without_cluster_fails_with_structured_error() {
    let output = cmd()
        .args(["probe", "--client", "admin", "--pool", "rbd"])
        .output()
        .expect("probe");
    assert!(!output.status.success());
    let value = parse_stderr_error(&output.stderr);
    let kind = value["error"]["kind"].as_str().expect("kind");
    assert!(
        ["Initialization", "Connection"].contains(&kind),
        "unexpected kind {kind}"
    );
    let expected = if kind == "Initialization" { 3 } else { 4 };
    assert_eq!(output.status.code(), Some(expected));
}

#[test]
fn invalid_options_file_is_configuration_error() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(file, "{{\"client_name\": \"admin\", \"bogus\": 1}}").expect("write");
    let output = cmd()
        .args(["conf-get", "--options", file.path().to_str().unwrap(), "mon_host"])
        .output()
        .expect("conf-get");
    assert_eq!(output.status.code(), Some(5));
    let value = parse_stderr_error(&output.stderr);
    assert_eq!(value["error"]["kind"], "Configuration");
    assert!(value["error"]["path"].as_str().is_some());
}

#[test]
fn malformed_set_flag_is_usage_error() {
    let output = cmd()
        .args(["probe", "--set", "no-equals-sign"])
        .output()
        .expect("probe");
    assert_eq!(output.status.code(), Some(2));
    let value = parse_stderr_error(&output.stderr);
    assert_eq!(value["error"]["kind"], "Usage");
}

#[test]
fn completion_script_mentions_subcommands() {
    let output = cmd()
        .args(["completion", "bash"])
        .output()
        .expect("completion");
    assert!(output.status.success());
    let script = String::from_utf8_lossy(&output.stdout);
    assert!(script.contains("radosbind"));
    assert!(script.contains("probe"));
}
