// Builds the Node binding and runs its test suite under a real Node host.
// Ignored by default: needs node, npm and Node headers. Run with `cargo test -- --ignored`.
use std::path::{Path, PathBuf};
use std::process::Command;

fn binding_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("bindings/node")
}

fn available(tool: &str) -> bool {
    Command::new(tool)
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn npm(args: &[&str]) {
    let output = Command::new("npm")
        .args(args)
        .current_dir(binding_dir())
        .env_remove("ADDON_FIXTURE_FORCE_FAKE")
        .output()
        .expect("spawn npm");
    assert!(
        output.status.success(),
        "npm {args:?} failed\nstdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
#[ignore = "requires node, npm and Node headers"]
fn node_loads_binding_past_mismatched_record() {
    if !available("node") || !available("npm") {
        eprintln!("node/npm not on PATH; skipping");
        return;
    }
    npm(&["run", "build"]);
    npm(&["test"]);
}
