// Runs the conformance binary against the shipped manifest and a few failing ones.
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn run_manifest(path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_addon-fixture-conformance"))
        .arg(path)
        .output()
        .expect("run conformance")
}

fn write_manifest(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("manifest.json");
    fs::write(&path, body).expect("write manifest");
    path
}

#[test]
fn shipped_manifest_passes() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("conformance/loader.json");
    let output = run_manifest(&path);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn wrong_expected_value_fails_with_step_context() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(
        temp.path(),
        r#"{
            "conformance_version": 0,
            "steps": [
                { "op": "load" },
                { "id": "bad-call", "op": "call", "name": "test", "expect": { "value": "Nope" } }
            ]
        }"#,
    );
    let output = run_manifest(&path);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("step 1 (bad-call)"), "stderr: {stderr}");
}

#[test]
fn trace_detects_unexpected_counts() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(
        temp.path(),
        r#"{
            "conformance_version": 0,
            "steps": [
                { "op": "load", "times": 2 },
                { "op": "trace", "expect": { "FakeInit": 1 } }
            ]
        }"#,
    );
    let output = run_manifest(&path);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("expected FakeInit = 1, got 0"), "stderr: {stderr}");
}

#[test]
fn call_before_load_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(
        temp.path(),
        r#"{ "conformance_version": 0, "steps": [ { "op": "call", "name": "test" } ] }"#,
    );
    let output = run_manifest(&path);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no module loaded"));
}

#[test]
fn unsupported_version_is_rejected() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = write_manifest(temp.path(), r#"{ "conformance_version": 9, "steps": [] }"#);
    let output = run_manifest(&path);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unsupported conformance_version: 9"));
}

#[test]
fn foreign_abi_manifest_expects_version_mismatch() {
    let temp = tempfile::tempdir().expect("tempdir");
    let foreign = addon_fixture::core::platform::NODE_MODULE_VERSION + 1;
    let body = format!(
        r#"{{
            "conformance_version": 0,
            "expected_version": {foreign},
            "steps": [
                {{ "op": "load", "expect": {{ "error": {{ "kind": "VersionMismatch" }} }} }},
                {{ "op": "trace", "expect": {{ "loads": 0, "RealInit": 0, "FakeInit": 0 }} }}
            ]
        }}"#
    );
    let path = write_manifest(temp.path(), &body);
    let output = run_manifest(&path);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}
