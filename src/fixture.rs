//! Purpose: The fixture itself: a real initializer, a fake one, and their registration table.
//! Exports: `real_init`, `fake_init`, `test_export`, `registry`, fixture constants.
//! Role: Single source of the literals shared by the Rust model and the Node binding.
//! Invariants: `real_init` binds exactly `test` and `isWin`.
//! Invariants: `fake_init` always fails with `FAKE_INIT_MESSAGE`; it is never a valid path.
use std::ffi::CStr;

use serde_json::Value;

use crate::core::error::{Error, ErrorKind};
use crate::core::exports::ExportsTable;
use crate::core::platform::{IS_WIN, NODE_MODULE_VERSION};
use crate::core::registry::{Candidate, Convention, Registry};

pub const MODULE_NAME: &CStr = c"binding";
pub const TEST_EXPORT: &str = "test";
pub const TEST_EXPORT_C: &CStr = c"test";
pub const IS_WIN_EXPORT: &str = "isWin";
pub const IS_WIN_EXPORT_C: &CStr = c"isWin";
pub const TEST_RESULT: &str = "Test";
pub const TEST_RESULT_C: &CStr = c"Test";

pub const FAKE_INIT_MESSAGE: &str = "FakeInit should never run!";
pub const FAKE_INIT_MESSAGE_C: &CStr = c"FakeInit should never run!";
/// Deliberately not a version any current loader expects.
pub const FAKE_MODULE_VERSION: i32 = 3;

pub const REAL_INIT_NAME: &str = "RealInit";
pub const FAKE_INIT_NAME: &str = "FakeInit";

pub fn test_export(_args: &[Value]) -> Value {
    Value::String(TEST_RESULT.to_string())
}

pub fn real_init(exports: &mut ExportsTable) -> Result<(), Error> {
    exports.bind_fn(TEST_EXPORT, test_export)?;
    exports.bind_bool(IS_WIN_EXPORT, IS_WIN)?;
    Ok(())
}

pub fn fake_init(_exports: &mut ExportsTable) -> Result<(), Error> {
    Err(Error::new(ErrorKind::Fatal)
        .with_message(FAKE_INIT_MESSAGE)
        .with_candidate(FAKE_INIT_NAME)
        .with_version(FAKE_MODULE_VERSION))
}

pub const REAL_CANDIDATE: Candidate = Candidate {
    name: REAL_INIT_NAME,
    convention: Convention::Specialized,
    version: NODE_MODULE_VERSION,
    context_aware: true,
    init: real_init,
};

pub const FAKE_CANDIDATE: Candidate = Candidate {
    name: FAKE_INIT_NAME,
    convention: Convention::Default,
    version: FAKE_MODULE_VERSION,
    context_aware: false,
    init: fake_init,
};

/// Both entry points, in the order the binary presents them.
pub fn registry() -> Result<Registry, Error> {
    Registry::new().with(REAL_CANDIDATE)?.with(FAKE_CANDIDATE)
}

#[cfg(test)]
mod tests {
    use super::{
        FAKE_INIT_MESSAGE, FAKE_INIT_MESSAGE_C, FAKE_MODULE_VERSION, IS_WIN_EXPORT,
        IS_WIN_EXPORT_C, REAL_CANDIDATE, TEST_EXPORT, TEST_EXPORT_C, TEST_RESULT, TEST_RESULT_C,
        fake_init, real_init, registry, test_export,
    };
    use crate::core::error::ErrorKind;
    use crate::core::exports::ExportsTable;
    use crate::core::loader::DEFAULT_MODULE_VERSION;
    use serde_json::{Value, json};

    #[test]
    fn test_export_ignores_arguments() {
        assert_eq!(test_export(&[]), json!(TEST_RESULT));
        assert_eq!(
            test_export(&[json!(1), json!("x"), Value::Null]),
            json!("Test")
        );
    }

    #[test]
    fn real_init_binds_exactly_two_exports() {
        let mut exports = ExportsTable::new();
        real_init(&mut exports).expect("init");
        assert_eq!(exports.names().collect::<Vec<_>>(), vec!["isWin", "test"]);
        assert_eq!(
            exports.read("isWin").expect("isWin"),
            Value::Bool(cfg!(windows))
        );
    }

    #[test]
    fn real_init_twice_on_one_table_fails() {
        let mut exports = ExportsTable::new();
        real_init(&mut exports).expect("init");
        assert_eq!(
            real_init(&mut exports).unwrap_err().kind(),
            ErrorKind::AlreadyExists
        );
    }

    #[test]
    fn fake_init_is_fatal_and_binds_nothing() {
        let mut exports = ExportsTable::new();
        let err = fake_init(&mut exports).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(err.message(), Some(FAKE_INIT_MESSAGE));
        assert!(exports.is_empty());
    }

    #[test]
    fn fake_version_never_matches_loader() {
        assert_ne!(FAKE_MODULE_VERSION, DEFAULT_MODULE_VERSION);
        assert_eq!(FAKE_INIT_MESSAGE_C.to_str().ok(), Some(FAKE_INIT_MESSAGE));
        assert_eq!(registry().expect("registry").len(), 2);
    }

    #[test]
    fn c_literals_match_rust_literals() {
        assert_eq!(TEST_EXPORT_C.to_str().ok(), Some(TEST_EXPORT));
        assert_eq!(IS_WIN_EXPORT_C.to_str().ok(), Some(IS_WIN_EXPORT));
        assert_eq!(TEST_RESULT_C.to_str().ok(), Some(TEST_RESULT));
    }

    #[test]
    fn real_initializer_is_named_for_host_abi() {
        let expected = format!("node_register_module_v{DEFAULT_MODULE_VERSION}");
        assert_eq!(REAL_CANDIDATE.symbol(), Some(expected));
    }
}
