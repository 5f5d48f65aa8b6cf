//! Purpose: Model the exports object an initializer populates at load time.
//! Exports: `ExportsTable`, `ExportValue`, `ExportFn`.
//! Role: Target of every initializer; read-only once the loader seals it.
//! Invariants: Each name is bound at most once; no binding after `seal`.
//! Invariants: Values are plain data or function pointers, so tables are `Send + Sync`.
use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

use super::error::{Error, ErrorKind};

/// Native callable exposed to the host. Arguments are the host's dynamic values.
pub type ExportFn = fn(&[Value]) -> Value;

#[derive(Clone, Copy, Debug)]
pub enum ExportValue {
    Function(ExportFn),
    Bool(bool),
}

impl ExportValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ExportValue::Function(_) => "function",
            ExportValue::Bool(_) => "boolean",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ExportsTable {
    entries: BTreeMap<String, ExportValue>,
    sealed: bool,
}

impl ExportsTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: impl Into<String>, value: ExportValue) -> Result<(), Error> {
        let name = name.into();
        if self.sealed {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("exports are sealed; cannot bind {name}")));
        }
        if self.entries.contains_key(&name) {
            return Err(Error::new(ErrorKind::AlreadyExists)
                .with_message(format!("export {name} is already bound")));
        }
        self.entries.insert(name, value);
        Ok(())
    }

    pub fn bind_fn(&mut self, name: impl Into<String>, function: ExportFn) -> Result<(), Error> {
        self.bind(name, ExportValue::Function(function))
    }

    pub fn bind_bool(&mut self, name: impl Into<String>, value: bool) -> Result<(), Error> {
        self.bind(name, ExportValue::Bool(value))
    }

    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ExportValue> {
        self.entries.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, Error> {
        match self.get(name) {
            Some(ExportValue::Function(function)) => Ok(function(args)),
            Some(other) => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("export {name} is a {}, not a function", other.type_name()))),
            None => Err(not_found(name)),
        }
    }

    /// Reads a non-function export as a host value.
    pub fn read(&self, name: &str) -> Result<Value, Error> {
        match self.get(name) {
            Some(ExportValue::Bool(value)) => Ok(Value::Bool(*value)),
            Some(ExportValue::Function(_)) => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("export {name} is a function; call it instead"))),
            None => Err(not_found(name)),
        }
    }

    /// Summary of the table: functions by type name, constants by value.
    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for (name, value) in &self.entries {
            let rendered = match value {
                ExportValue::Function(_) => json!("function"),
                ExportValue::Bool(flag) => json!(flag),
            };
            out.insert(name.clone(), rendered);
        }
        Value::Object(out)
    }
}

fn not_found(name: &str) -> Error {
    Error::new(ErrorKind::NotFound).with_message(format!("no export named {name}"))
}

#[cfg(test)]
mod tests {
    use super::{ExportValue, ExportsTable};
    use crate::core::error::ErrorKind;
    use serde_json::{Value, json};

    fn echo_len(args: &[Value]) -> Value {
        json!(args.len())
    }

    #[test]
    fn duplicate_binding_is_rejected() {
        let mut table = ExportsTable::new();
        table.bind_bool("flag", true).expect("first bind");
        let err = table.bind_bool("flag", false).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(table.read("flag").expect("read"), Value::Bool(true));
    }

    #[test]
    fn sealed_table_rejects_new_bindings() {
        let mut table = ExportsTable::new();
        table.bind_fn("len", echo_len).expect("bind");
        table.seal();
        assert!(table.is_sealed());
        let err = table.bind_bool("late", true).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Usage);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn call_and_read_check_export_kinds() {
        let mut table = ExportsTable::new();
        table.bind_fn("len", echo_len).expect("bind fn");
        table.bind_bool("flag", false).expect("bind bool");

        assert_eq!(table.call("len", &[json!(1), json!("x")]).expect("call"), json!(2));
        assert_eq!(table.call("flag", &[]).unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(table.read("len").unwrap_err().kind(), ErrorKind::Usage);
        assert_eq!(table.call("missing", &[]).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(matches!(table.get("flag"), Some(ExportValue::Bool(false))));
    }

    #[test]
    fn json_summary_lists_every_export() {
        let mut table = ExportsTable::new();
        table.bind_fn("len", echo_len).expect("bind fn");
        table.bind_bool("flag", true).expect("bind bool");
        assert_eq!(table.to_json(), json!({"flag": true, "len": "function"}));
        assert_eq!(table.names().collect::<Vec<_>>(), vec!["flag", "len"]);
    }
}
