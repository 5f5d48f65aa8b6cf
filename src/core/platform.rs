//! Purpose: Build-time platform constants surfaced to exports and the loader model.
//! Exports: `IS_WIN`, `TARGET_FAMILY`, `TARGET`, `NODE_MODULE_VERSION`.
//! Invariants: Values come from the compiler and `build.rs`; nothing is probed at runtime.

/// True when compiled for the Windows target family.
pub const IS_WIN: bool = cfg!(target_family = "windows");

/// Comma-separated `target_family` list recorded by `build.rs` (e.g. `unix`, `unix,wasm`).
pub const TARGET_FAMILY: &str = env!("ADDON_FIXTURE_TARGET_FAMILY");

pub const TARGET: &str = env!("ADDON_FIXTURE_TARGET");

include!(concat!(env!("OUT_DIR"), "/node_abi.rs"));

pub fn target_families() -> impl Iterator<Item = &'static str> {
    TARGET_FAMILY.split(',').map(str::trim).filter(|family| !family.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{IS_WIN, NODE_MODULE_VERSION, TARGET, target_families};

    #[test]
    fn is_win_agrees_with_build_script_family() {
        let windows = target_families().any(|family| family == "windows");
        assert_eq!(IS_WIN, windows);
    }

    #[test]
    fn target_triple_is_recorded() {
        assert!(!TARGET.is_empty());
        assert_eq!(TARGET.contains("windows"), IS_WIN);
    }

    #[test]
    fn node_abi_is_a_real_module_version() {
        // Node 0.10 shipped 11; every released ABI since is larger.
        assert!(NODE_MODULE_VERSION > 11);
    }
}
