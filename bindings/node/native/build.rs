/*
Purpose: Compile the V8 shim and generate the ABI-named entry point for the Node addon.
Exports: None (build script only).
Role: Locate Node headers, read NODE_MODULE_VERSION from them, emit `node_register_module_v<ABI>`.
Invariants: The entry symbol's ABI is the one in the headers the shim compiles against.
Invariants: Node and V8 symbols stay unresolved until the host process loads the addon.
Notes: Header search: NODE_INCLUDE_DIR, the running node's prefix, the node-gyp cache, system dirs.
Notes: Windows links `node.lib` from NODE_LIB_DIR.
*/

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=c/v8_shim.cc");
    println!("cargo:rerun-if-env-changed=NODE_INCLUDE_DIR");
    println!("cargo:rerun-if-env-changed=NODE_LIB_DIR");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR"));
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR"));

    let include_dir = node_include_dir();
    let version_header = include_dir.join("node_version.h");
    let abi = fs::read_to_string(&version_header)
        .ok()
        .and_then(|header| parse_module_version(&header))
        .unwrap_or_else(|| {
            panic!(
                "NODE_MODULE_VERSION not found in {}; set NODE_INCLUDE_DIR to a Node header directory",
                version_header.display()
            )
        });

    let mut build = cc::Build::new();
    build
        .cpp(true)
        .include(&include_dir)
        .file(manifest_dir.join("c").join("v8_shim.cc"));
    if build.get_compiler().is_like_msvc() {
        build.flag("/std:c++20");
    } else {
        build
            .flag_if_supported("-std=c++20")
            .flag_if_supported("-Wno-unused-parameter");
    }
    build.compile("addon_fixture_v8_shim");

    fs::write(
        out_dir.join("entry.rs"),
        format!(
            "/// NODE_MODULE_VERSION read from `{header}`.\n\
             pub const ENTRY_ABI: i32 = {abi};\n\
             \n\
             #[unsafe(no_mangle)]\n\
             pub unsafe extern \"C\" fn node_register_module_v{abi}(\n    \
                 exports: Local,\n    \
                 module: Local,\n    \
                 context: Local,\n\
             ) {{\n    \
                 unsafe {{ register_module(exports, module, context) }}\n\
             }}\n",
            header = version_header.display()
        ),
    )
    .expect("failed to write entry.rs");

    match target_os.as_str() {
        "macos" => {
            println!("cargo:rustc-cdylib-link-arg=-undefined");
            println!("cargo:rustc-cdylib-link-arg=dynamic_lookup");
        }
        "windows" => match env::var_os("NODE_LIB_DIR") {
            Some(dir) => {
                println!("cargo:rustc-link-search=native={}", PathBuf::from(dir).display());
                println!("cargo:rustc-link-lib=node");
            }
            None => println!("cargo:warning=NODE_LIB_DIR unset; linking may miss node.lib"),
        },
        _ => {}
    }
}

fn node_include_dir() -> PathBuf {
    let mut candidates: Vec<PathBuf> = env::var_os("NODE_INCLUDE_DIR")
        .map(PathBuf::from)
        .into_iter()
        .collect();

    if let Some(exec_path) = node_eval("process.execPath") {
        if let Some(prefix) = Path::new(&exec_path).parent().and_then(Path::parent) {
            candidates.push(prefix.join("include").join("node"));
        }
    }
    if let (Some(version), Some(home)) = (node_eval("process.versions.node"), env::var_os("HOME")) {
        let home = PathBuf::from(home);
        for cache in [
            home.join(".cache").join("node-gyp"),
            home.join("Library").join("Caches").join("node-gyp"),
        ] {
            candidates.push(cache.join(&version).join("include").join("node"));
        }
    }
    candidates.push(PathBuf::from("/usr/include/node"));
    candidates.push(PathBuf::from("/usr/local/include/node"));

    candidates
        .iter()
        .find(|dir| dir.join("node.h").exists() && dir.join("v8.h").exists())
        .cloned()
        .unwrap_or_else(|| {
            panic!(
                "Node headers not found (searched {candidates:?}); set NODE_INCLUDE_DIR or run `npx node-gyp install`"
            )
        })
}

fn node_eval(expr: &str) -> Option<String> {
    Command::new("node")
        .args(["-p", expr])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|stdout| stdout.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_module_version(header: &str) -> Option<i32> {
    header.lines().find_map(|line| {
        let rest = line.trim().strip_prefix("#define NODE_MODULE_VERSION")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}
