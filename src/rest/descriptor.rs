use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::error::RestError;
use crate::rest::entity::{ID_FIELD, Record};

/// Cacheable read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchMethod {
    Fetch,
    FetchAll,
    FetchPage,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Fetch => "fetch",
            FetchMethod::FetchAll => "fetchAll",
            FetchMethod::FetchPage => "fetchPage",
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FetchMethod {
    type Err = RestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fetch" => Ok(FetchMethod::Fetch),
            "fetchAll" => Ok(FetchMethod::FetchAll),
            "fetchPage" => Ok(FetchMethod::FetchPage),
            other => Err(RestError::UnknownFetchMethod(other.to_string())),
        }
    }
}

/// Content-equal key of one fetch request: entity, method and normalized
/// arguments. Two descriptors built independently from equal inputs are
/// equal and hash the same, whatever the key order of their arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Descriptor {
    entity: String,
    method: FetchMethod,
    args: String,
}

impl Descriptor {
    pub fn new(entity: &str, method: FetchMethod, args: &Record) -> Self {
        Self {
            entity: entity.to_string(),
            method,
            args: canonical(&Value::Object(args.clone())).to_string(),
        }
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn method(&self) -> FetchMethod {
        self.method
    }

    /// Canonical (sorted-key) JSON encoding of the arguments.
    pub fn args(&self) -> &str {
        &self.args
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}({})", self.entity, self.method, self.args)
    }
}

/// Normalize fetch arguments: a bare id becomes `{id}`, null becomes `{}`.
pub fn normalize_args(args: Value) -> Record {
    match args {
        Value::Object(map) => map,
        Value::Null => Record::new(),
        id => {
            let mut map = Record::new();
            map.insert(ID_FIELD.to_string(), id);
            map
        }
    }
}

/// Rebuild `value` with every object's keys in sorted order.
fn canonical(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = serde_json::Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonical(&map[key.as_str()]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        other => other.clone(),
    }
}
