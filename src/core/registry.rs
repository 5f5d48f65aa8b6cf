//! Purpose: Explicit table of candidate module initializers.
//! Exports: `Registry`, `Candidate`, `Convention`, `InitFn`, `VERSION_AGNOSTIC`.
//! Role: Replaces symbol-name conventions with tagged records a loader can inspect.
//! Invariants: Registration order is preserved; at most one candidate per convention.
//! Invariants: A `Specialized` candidate's version is the ABI baked into its symbol name.
use serde::Serialize;

use super::error::{Error, ErrorKind};
use super::exports::ExportsTable;

/// Version tag of N-API modules; accepted by every loader version.
pub const VERSION_AGNOSTIC: i32 = -1;

pub type InitFn = fn(&mut ExportsTable) -> Result<(), Error>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Convention {
    /// Exported as `node_register_module_v<version>`; only found by a loader of that ABI.
    Specialized,
    /// Exported as `napi_register_module_v1`; only consulted when no record is pending.
    NodeApi,
    /// Handed to the host's `node_module_register` while the library loads.
    Default,
}

impl Convention {
    pub fn as_str(self) -> &'static str {
        match self {
            Convention::Specialized => "specialized",
            Convention::NodeApi => "node_api",
            Convention::Default => "default",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Candidate {
    pub name: &'static str,
    pub convention: Convention,
    pub version: i32,
    /// Legacy `NODE_MODULE` records are not context-aware.
    pub context_aware: bool,
    #[serde(skip)]
    pub init: InitFn,
}

impl Candidate {
    pub fn invoke(&self, exports: &mut ExportsTable) -> Result<(), Error> {
        (self.init)(exports)
    }

    pub fn accepts_version(&self, expected: i32) -> bool {
        self.version == VERSION_AGNOSTIC || self.version == expected
    }

    /// Exported symbol for symbol-found conventions; `None` for load-time records.
    pub fn symbol(&self) -> Option<String> {
        match self.convention {
            Convention::Specialized => Some(format!("node_register_module_v{}", self.version)),
            Convention::NodeApi => Some("napi_register_module_v1".to_string()),
            Convention::Default => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Registry {
    candidates: Vec<Candidate>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, candidate: Candidate) -> Result<(), Error> {
        if let Some(existing) = self.find(candidate.convention) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!(
                    "{} entry point already registered as {}",
                    candidate.convention.as_str(),
                    existing.name
                ))
                .with_candidate(candidate.name));
        }
        self.candidates.push(candidate);
        Ok(())
    }

    pub fn with(mut self, candidate: Candidate) -> Result<Self, Error> {
        self.register(candidate)?;
        Ok(self)
    }

    pub fn find(&self, convention: Convention) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|candidate| candidate.convention == convention)
    }

    pub fn get(&self, name: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|candidate| candidate.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
