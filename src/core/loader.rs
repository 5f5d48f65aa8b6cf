//! Purpose: Reference loader applying Node's `process.dlopen` resolution to a `Registry`.
//! Exports: `Loader`, `LoaderConfig`, `LoadedModule`, `LoadTrace`, `DEFAULT_MODULE_VERSION`.
//! Role: Harness for the fixture; stands in for the host loader in tests and tooling.
//! Invariants: A pending `Default` record always wins unless its version is wrong.
//! Invariants: A wrong-version record is only bypassed by `node_register_module_v<expected>`;
//! `napi_register_module_v1` is consulted only when no record is pending.
//! Invariants: Every load builds and seals a fresh exports table; failures propagate unchanged.
//! Notes: Invocation counts accumulate across loads so harnesses can assert non-invocation.
use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::error::{Error, ErrorKind};
use super::exports::ExportsTable;
use super::platform;
use super::registry::{Candidate, Convention, Registry};

/// `NODE_MODULE_VERSION` of the Node this crate was built against.
pub const DEFAULT_MODULE_VERSION: i32 = platform::NODE_MODULE_VERSION;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LoaderConfig {
    pub expected_version: i32,
    /// Mirrors `--force-context-aware`: pending legacy records are refused.
    pub force_context_aware: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            expected_version: DEFAULT_MODULE_VERSION,
            force_context_aware: false,
        }
    }
}

impl LoaderConfig {
    pub fn with_expected_version(mut self, version: i32) -> Self {
        self.expected_version = version;
        self
    }

    pub fn with_force_context_aware(mut self, force: bool) -> Self {
        self.force_context_aware = force;
        self
    }
}

#[derive(Debug)]
pub struct LoadedModule {
    pub chosen: &'static str,
    pub convention: Convention,
    pub exports: ExportsTable,
}

impl LoadedModule {
    pub fn to_json(&self) -> Value {
        json!({
            "chosen": self.chosen,
            "convention": self.convention,
            "exports": self.exports.to_json(),
        })
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
pub struct LoadTrace {
    loads: u64,
    invocations: BTreeMap<String, u64>,
}

impl LoadTrace {
    pub fn loads(&self) -> u64 {
        self.loads
    }

    pub fn invocations(&self, name: &str) -> u64 {
        self.invocations.get(name).copied().unwrap_or(0)
    }
}

#[derive(Debug, Default)]
pub struct Loader {
    config: LoaderConfig,
    trace: LoadTrace,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self {
            config,
            trace: LoadTrace::default(),
        }
    }

    pub fn config(&self) -> LoaderConfig {
        self.config
    }

    pub fn trace(&self) -> &LoadTrace {
        &self.trace
    }

    /// Picks the candidate the host would run for `registry`.
    pub fn resolve<'r>(&self, registry: &'r Registry) -> Result<&'r Candidate, Error> {
        let expected = self.config.expected_version;
        // The host looks the symbol up by name, so only a matching ABI is ever found.
        let named = registry
            .find(Convention::Specialized)
            .filter(|candidate| candidate.version == expected);

        let Some(pending) = registry.find(Convention::Default) else {
            return named
                .or_else(|| registry.find(Convention::NodeApi))
                .ok_or_else(|| {
                    Error::new(ErrorKind::NotRegistered).with_message("Module did not self-register")
                });
        };

        if !pending.context_aware && self.config.force_context_aware {
            return Err(Error::new(ErrorKind::NonContextAware)
                .with_message("Loading non context-aware native addons has been disabled")
                .with_candidate(pending.name));
        }

        if pending.accepts_version(expected) {
            return Ok(pending);
        }

        match named {
            Some(candidate) => {
                debug!(
                    candidate = candidate.name,
                    bypassed = pending.name,
                    version = pending.version,
                    expected,
                    "pending record has a mismatched version; using named initializer"
                );
                Ok(candidate)
            }
            None => {
                warn!(
                    candidate = pending.name,
                    version = pending.version,
                    expected,
                    "pending record has a mismatched version and no named initializer matches"
                );
                Err(Error::new(ErrorKind::VersionMismatch)
                    .with_message(format!(
                        "module was compiled against NODE_MODULE_VERSION {}; this loader requires NODE_MODULE_VERSION {expected}",
                        pending.version
                    ))
                    .with_candidate(pending.name)
                    .with_version(pending.version))
            }
        }
    }

    /// Resolves, invokes and seals; the chosen initializer's error is returned as-is.
    pub fn load(&mut self, registry: &Registry) -> Result<LoadedModule, Error> {
        let candidate = *self.resolve(registry)?;
        self.trace.loads += 1;
        *self
            .trace
            .invocations
            .entry(candidate.name.to_string())
            .or_insert(0) += 1;

        debug!(
            candidate = candidate.name,
            convention = candidate.convention.as_str(),
            "invoking initializer"
        );
        let mut exports = ExportsTable::new();
        candidate.invoke(&mut exports)?;
        exports.seal();

        Ok(LoadedModule {
            chosen: candidate.name,
            convention: candidate.convention,
            exports,
        })
    }
}
