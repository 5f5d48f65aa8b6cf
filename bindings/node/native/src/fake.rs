/*
Purpose: Register a legacy `node_module` record with a deliberately wrong version.
Exports: None; registration runs from the library's load-time constructor.
Role: Negative control; a conforming loader must load the addon without ever calling `fake_init`.
Invariants: nm_version is `FAKE_MODULE_VERSION`; nm_context_register_func is null (plain NODE_MODULE).
Invariants: `fake_init` throws a JS Error carrying `FAKE_INIT_MESSAGE`.
Notes: ADDON_FIXTURE_FORCE_FAKE retags the record with the entry ABI so harnesses can make Node run it.
Notes: `node_module_register` is looked up in the host process; outside Node registration is a no-op.
Notes: Only built where a load-time constructor section exists (ELF `.init_array`, Mach-O `__mod_init_func`).
*/

use addon_fixture::fixture::{FAKE_INIT_MESSAGE_C, FAKE_MODULE_VERSION, MODULE_NAME};
use libc::{c_char, c_int, c_uint, c_void};

use crate::{ENTRY_ABI, throw_error};

const FORCE_FAKE_ENV: &str = "ADDON_FIXTURE_FORCE_FAKE";

type AddonRegisterFunc = unsafe extern "C" fn(*mut c_void, *mut c_void, *mut c_void);
type AddonContextRegisterFunc =
    unsafe extern "C" fn(*mut c_void, *mut c_void, *mut c_void, *mut c_void);

// Mirrors `struct node_module` from node.h.
#[repr(C)]
struct node_module {
    nm_version: c_int,
    nm_flags: c_uint,
    nm_dso_handle: *mut c_void,
    nm_filename: *const c_char,
    nm_register_func: Option<AddonRegisterFunc>,
    nm_context_register_func: Option<AddonContextRegisterFunc>,
    nm_modname: *const c_char,
    nm_priv: *mut c_void,
    nm_link: *mut node_module,
}

// The host keeps a pointer to this record and writes `nm_dso_handle`/`nm_link`.
static mut FAKE_MODULE: node_module = node_module {
    nm_version: FAKE_MODULE_VERSION,
    nm_flags: 0,
    nm_dso_handle: std::ptr::null_mut(),
    nm_filename: c"src/fake.rs".as_ptr(),
    nm_register_func: Some(fake_init),
    nm_context_register_func: None,
    nm_modname: MODULE_NAME.as_ptr(),
    nm_priv: std::ptr::null_mut(),
    nm_link: std::ptr::null_mut(),
};

unsafe extern "C" fn fake_init(_exports: *mut c_void, _module: *mut c_void, _priv: *mut c_void) {
    throw_error(FAKE_INIT_MESSAGE_C);
}

extern "C" fn register_fake_module() {
    let symbol = unsafe { libc::dlsym(libc::RTLD_DEFAULT, c"node_module_register".as_ptr()) };
    if symbol.is_null() {
        return;
    }
    let module = &raw mut FAKE_MODULE;
    if std::env::var_os(FORCE_FAKE_ENV).is_some_and(|value| !value.is_empty()) {
        unsafe { (*module).nm_version = ENTRY_ABI };
    }
    let register: unsafe extern "C" fn(*mut c_void) = unsafe { std::mem::transmute(symbol) };
    unsafe { register(module.cast()) };
}

#[cfg(any(target_os = "linux", target_os = "android", target_os = "freebsd"))]
#[used]
#[unsafe(link_section = ".init_array")]
static REGISTER_FAKE_MODULE: extern "C" fn() = register_fake_module;

#[cfg(target_os = "macos")]
#[used]
#[unsafe(link_section = "__DATA,__mod_init_func")]
static REGISTER_FAKE_MODULE: extern "C" fn() = register_fake_module;
