//! Purpose: Publish the target platform family and the host Node ABI to the crate at build time.
//! Role: Cargo build-script; feeds `core::platform` its compile-time constants.
//! Invariants: Platform values use only Cargo-provided env vars (`CARGO_CFG_TARGET_FAMILY`, `TARGET`).
//! Invariants: The Node ABI resolves once per build: `ADDON_FIXTURE_NODE_ABI`, then
//! `NODE_INCLUDE_DIR/node_version.h`, then `node -p process.versions.modules`.
//! Notes: Falls back to `FALLBACK_NODE_ABI` with a cargo warning when no Node is available.
use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::Command;

// NODE_MODULE_VERSION of Node 22.
const FALLBACK_NODE_ABI: i32 = 127;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=ADDON_FIXTURE_NODE_ABI");
    println!("cargo:rerun-if-env-changed=NODE_INCLUDE_DIR");

    let family = env::var("CARGO_CFG_TARGET_FAMILY").unwrap_or_default();
    let target = env::var("TARGET").unwrap_or_default();

    println!("cargo:rustc-env=ADDON_FIXTURE_TARGET_FAMILY={family}");
    println!("cargo:rustc-env=ADDON_FIXTURE_TARGET={target}");

    let (abi, source) = resolve_node_abi();
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    fs::write(
        out_dir.join("node_abi.rs"),
        format!(
            "/// `NODE_MODULE_VERSION` of the host Node this crate was built against ({source}).\n\
             pub const NODE_MODULE_VERSION: i32 = {abi};\n"
        ),
    )
    .expect("failed to write node_abi.rs");
}

fn resolve_node_abi() -> (i32, &'static str) {
    if let Some(abi) = env::var("ADDON_FIXTURE_NODE_ABI")
        .ok()
        .and_then(|value| value.trim().parse().ok())
    {
        return (abi, "ADDON_FIXTURE_NODE_ABI");
    }
    if let Some(abi) = env::var_os("NODE_INCLUDE_DIR")
        .map(|dir| PathBuf::from(dir).join("node_version.h"))
        .and_then(|header| fs::read_to_string(header).ok())
        .and_then(|header| parse_module_version(&header))
    {
        return (abi, "node_version.h");
    }
    if let Some(abi) = Command::new("node")
        .args(["-p", "process.versions.modules"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .and_then(|stdout| stdout.trim().parse().ok())
    {
        return (abi, "node -p process.versions.modules");
    }
    println!(
        "cargo:warning=no Node found; assuming NODE_MODULE_VERSION {FALLBACK_NODE_ABI} \
         (set ADDON_FIXTURE_NODE_ABI to override)"
    );
    (FALLBACK_NODE_ABI, "fallback")
}

fn parse_module_version(header: &str) -> Option<i32> {
    header.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("#define NODE_MODULE_VERSION")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}
