//! Purpose: Execute loader conformance manifests against the fixture.
//! Exports: None (binary entry point).
//! Role: Reference runner for JSON conformance manifests.
//! Invariants: Manifests are JSON-only; steps execute in order; fail-fast on errors.
//! Invariants: One loader instance per manifest, so `trace` steps see every prior load.

use addon_fixture::core::error::Error;
use addon_fixture::core::exports::ExportsTable;
use addon_fixture::core::loader::{DEFAULT_MODULE_VERSION, LoadedModule, Loader, LoaderConfig};
use addon_fixture::core::platform::IS_WIN;
use addon_fixture::core::registry::{Convention, Registry};
use addon_fixture::fixture;
use serde_json::Value;
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

struct Session {
    registry: Registry,
    loader: Loader,
    module: Option<LoadedModule>,
}

fn run() -> Result<(), String> {
    let mut args = env::args();
    let _exe = args.next();
    let manifest_path = args
        .next()
        .ok_or_else(|| "usage: addon-fixture-conformance <path/to/manifest.json>".to_string())?;
    if args.next().is_some() {
        return Err("unexpected extra arguments".to_string());
    }

    let manifest_path = PathBuf::from(manifest_path);
    let content = fs::read_to_string(&manifest_path)
        .map_err(|err| format!("failed to read manifest: {err}"))?;
    let manifest: Value = serde_json::from_str(&content)
        .map_err(|err| format!("failed to parse manifest json: {err}"))?;

    let version = manifest
        .get("conformance_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| "missing conformance_version".to_string())?;
    if version != 0 {
        return Err(format!("unsupported conformance_version: {version}"));
    }

    let expected_version = manifest
        .get("expected_version")
        .map(|value| as_i32(value).ok_or_else(|| "expected_version must be an integer".to_string()))
        .transpose()?
        .unwrap_or(DEFAULT_MODULE_VERSION);

    let steps = manifest
        .get("steps")
        .and_then(Value::as_array)
        .ok_or_else(|| "manifest steps must be an array".to_string())?;

    let registry = fixture::registry().map_err(|err| format!("fixture registry: {err}"))?;
    let mut session = Session {
        registry,
        loader: Loader::new(LoaderConfig::default().with_expected_version(expected_version)),
        module: None,
    };

    for (index, step) in steps.iter().enumerate() {
        let step_id = step.get("id").and_then(Value::as_str).map(str::to_string);
        let op = step
            .get("op")
            .and_then(Value::as_str)
            .ok_or_else(|| step_err(index, &step_id, "missing op"))?;
        match op {
            "load" => run_load(&mut session, step, index, &step_id)?,
            "call" => run_call(&session, step, index, &step_id)?,
            "read" => run_read(&session, step, index, &step_id)?,
            "invoke_default" => run_invoke_default(&session, step, index, &step_id)?,
            "trace" => run_trace(&session, step, index, &step_id)?,
            _ => return Err(step_err(index, &step_id, &format!("unknown op: {op}"))),
        }
    }

    Ok(())
}

fn run_load(
    session: &mut Session,
    step: &Value,
    index: usize,
    step_id: &Option<String>,
) -> Result<(), String> {
    let times = step.get("times").and_then(Value::as_u64).unwrap_or(1);
    if times == 0 {
        return Err(step_err(index, step_id, "times must be at least 1"));
    }
    let expect = step.get("expect");
    for _ in 0..times {
        match session.loader.load(&session.registry) {
            Ok(module) => {
                validate_expect_error(expect, None, index, step_id)?;
                if let Some(chosen) = expect
                    .and_then(|expect| expect.get("chosen"))
                    .and_then(Value::as_str)
                {
                    if module.chosen != chosen {
                        return Err(step_err(
                            index,
                            step_id,
                            &format!("expected {chosen} to run, got {}", module.chosen),
                        ));
                    }
                }
                if let Some(expected) = expect.and_then(|expect| expect.get("exports")) {
                    let expected = resolve_token(expected);
                    let actual = module.exports.to_json();
                    if actual != expected {
                        return Err(step_err(
                            index,
                            step_id,
                            &format!("exports mismatch: expected {expected}, got {actual}"),
                        ));
                    }
                }
                session.module = Some(module);
            }
            Err(err) => return validate_expect_error(expect, Some(&err), index, step_id),
        }
    }
    Ok(())
}

fn run_call(
    session: &Session,
    step: &Value,
    index: usize,
    step_id: &Option<String>,
) -> Result<(), String> {
    let exports = loaded_exports(session, index, step_id)?;
    let name = required_str(step, "name", index, step_id)?;
    let args = match step.get("args") {
        None => Vec::new(),
        Some(Value::Array(args)) => args.clone(),
        Some(_) => return Err(step_err(index, step_id, "args must be an array")),
    };
    match exports.call(name, &args) {
        Ok(value) => {
            validate_expect_error(step.get("expect"), None, index, step_id)?;
            validate_expect_value(step.get("expect"), &value, index, step_id)
        }
        Err(err) => validate_expect_error(step.get("expect"), Some(&err), index, step_id),
    }
}

fn run_read(
    session: &Session,
    step: &Value,
    index: usize,
    step_id: &Option<String>,
) -> Result<(), String> {
    let exports = loaded_exports(session, index, step_id)?;
    let name = required_str(step, "name", index, step_id)?;
    let actual = match exports.read(name) {
        Ok(actual) => actual,
        Err(err) => return validate_expect_error(step.get("expect"), Some(&err), index, step_id),
    };
    validate_expect_error(step.get("expect"), None, index, step_id)?;
    validate_expect_value(step.get("expect"), &actual, index, step_id)
}

fn run_invoke_default(
    session: &Session,
    step: &Value,
    index: usize,
    step_id: &Option<String>,
) -> Result<(), String> {
    let candidate = session
        .registry
        .find(Convention::Default)
        .ok_or_else(|| step_err(index, step_id, "no default entry point registered"))?;
    let mut exports = ExportsTable::new();
    match candidate.invoke(&mut exports) {
        Ok(()) => validate_expect_error(step.get("expect"), None, index, step_id),
        Err(err) => validate_expect_error(step.get("expect"), Some(&err), index, step_id),
    }
}

fn run_trace(
    session: &Session,
    step: &Value,
    index: usize,
    step_id: &Option<String>,
) -> Result<(), String> {
    let trace = session.loader.trace();
    let Some(expect) = step.get("expect").and_then(Value::as_object) else {
        return Err(step_err(index, step_id, "trace requires an expect object"));
    };
    for (name, count) in expect {
        let count = count
            .as_u64()
            .ok_or_else(|| step_err(index, step_id, "trace counts must be integers"))?;
        let actual = if name == "loads" {
            trace.loads()
        } else {
            trace.invocations(name)
        };
        if actual != count {
            return Err(step_err(
                index,
                step_id,
                &format!("expected {name} = {count}, got {actual}"),
            ));
        }
    }
    Ok(())
}

fn loaded_exports<'s>(
    session: &'s Session,
    index: usize,
    step_id: &Option<String>,
) -> Result<&'s ExportsTable, String> {
    session
        .module
        .as_ref()
        .map(|module| &module.exports)
        .ok_or_else(|| step_err(index, step_id, "no module loaded; add a load step first"))
}

fn required_str<'v>(
    step: &'v Value,
    key: &str,
    index: usize,
    step_id: &Option<String>,
) -> Result<&'v str, String> {
    step.get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| step_err(index, step_id, &format!("missing {key}")))
}

fn validate_expect_value(
    expect: Option<&Value>,
    actual: &Value,
    index: usize,
    step_id: &Option<String>,
) -> Result<(), String> {
    let Some(expected) = expect.and_then(|expect| expect.get("value")) else {
        return Ok(());
    };
    let expected = resolve_token(expected);
    if &expected != actual {
        return Err(step_err(
            index,
            step_id,
            &format!("value mismatch: expected {expected}, got {actual}"),
        ));
    }
    Ok(())
}

fn validate_expect_error(
    expect: Option<&Value>,
    result: Option<&Error>,
    index: usize,
    step_id: &Option<String>,
) -> Result<(), String> {
    let expected = expect.and_then(|expect| expect.get("error"));
    match (expected, result) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(step_err(index, step_id, "expected error but operation succeeded")),
        (None, Some(err)) => Err(step_err(index, step_id, &format!("unexpected error: {err}"))),
        (Some(expected), Some(err)) => {
            if let Some(kind) = expected.get("kind").and_then(Value::as_str) {
                if kind != err.kind().label() {
                    return Err(step_err(
                        index,
                        step_id,
                        &format!("expected error kind {kind}, got {}", err.kind().label()),
                    ));
                }
            }
            if let Some(message) = expected.get("message").and_then(Value::as_str) {
                if err.message() != Some(message) {
                    return Err(step_err(
                        index,
                        step_id,
                        &format!("expected error message {message:?}, got {err}"),
                    ));
                }
            }
            Ok(())
        }
    }
}

// `"$is_win"` stands for the build's platform flag so one manifest fits every target.
fn resolve_token(value: &Value) -> Value {
    match value {
        Value::String(token) if token == "$is_win" => Value::Bool(IS_WIN),
        Value::Array(items) => Value::Array(items.iter().map(resolve_token).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(key, value)| (key.clone(), resolve_token(value)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn as_i32(value: &Value) -> Option<i32> {
    value.as_i64().and_then(|value| i32::try_from(value).ok())
}

fn step_err(index: usize, step_id: &Option<String>, message: &str) -> String {
    match step_id {
        Some(id) => format!("step {index} ({id}): {message}"),
        None => format!("step {index}: {message}"),
    }
}
