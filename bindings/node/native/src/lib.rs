/*
Purpose: Node addon with two competing entry points for loader conformance testing.
Key Exports: test(), isWin.
Role: `node_register_module_v<ABI>` (generated by build.rs) populates exports through the V8 shim.
Invariants: Exports are bound once per load, from `addon_fixture::fixture` constants.
Invariants: The entry ABI equals the `NODE_MODULE_VERSION` the `addon-fixture` crate was built with.
Invariants: The legacy record registered by `fake` is tagged NODE_MODULE_VERSION 3 and must never run.
Notes: Node only looks the named initializer up after the pending record fails its version check.
*/

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd", target_os = "macos"))]
mod fake;

use std::ffi::{CStr, c_char, c_void};

use addon_fixture::core::platform::{IS_WIN, NODE_MODULE_VERSION};
use addon_fixture::fixture::{IS_WIN_EXPORT_C, TEST_EXPORT_C, TEST_RESULT_C};

/// A V8 `Local<T>`: one pointer, passed by value.
#[repr(transparent)]
#[derive(Clone, Copy)]
pub struct Local(*mut c_void);

unsafe extern "C" {
    fn afx_set_string_method(
        exports: Local,
        context: Local,
        name: *const c_char,
        produce: extern "C" fn() -> *const c_char,
    ) -> bool;
    fn afx_set_bool(exports: Local, context: Local, name: *const c_char, value: bool) -> bool;
    fn afx_throw_error(message: *const c_char);
}

include!(concat!(env!("OUT_DIR"), "/entry.rs"));

const _: () = assert!(
    ENTRY_ABI == NODE_MODULE_VERSION,
    "Node headers and addon-fixture disagree on NODE_MODULE_VERSION; set NODE_INCLUDE_DIR"
);

extern "C" fn test_result() -> *const c_char {
    TEST_RESULT_C.as_ptr()
}

unsafe fn register_module(exports: Local, _module: Local, context: Local) {
    // On failure V8 already holds the exception; Node rethrows it from dlopen.
    let _ = unsafe { afx_set_string_method(exports, context, TEST_EXPORT_C.as_ptr(), test_result) }
        && unsafe { afx_set_bool(exports, context, IS_WIN_EXPORT_C.as_ptr(), IS_WIN) };
}

pub(crate) fn throw_error(message: &CStr) {
    unsafe { afx_throw_error(message.as_ptr()) };
}
