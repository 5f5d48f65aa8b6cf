//! Purpose: Rust model of a native addon with a real and a fake module entry point.
//! Exports: `core` (errors, exports table, platform, registry, loader), `fixture`.
//! Role: Library backing the `addon-fixture` CLI, the conformance runner and the Node binding.
//! Invariants: The real initializer is the only candidate a conforming loader invokes.
//! Invariants: No global state; every load builds a fresh exports table.
pub mod core;
pub mod fixture;
