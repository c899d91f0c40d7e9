use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field values of a single entity instance keyed by field name.
pub type Record = serde_json::Map<String, Value>;

/// Name of the primary key field of simple entities.
pub const ID_FIELD: &str = "id";

/// Key of a cached record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntityId {
    /// Signed 64-bit integer id.
    Int(i64),
    /// String id.
    String(String),
    /// Parent key values of a relationship entity, in declared parent order.
    Composite(Vec<EntityId>),
}

impl EntityId {
    /// Interpret a field value as an id. Nulls, floats, booleans and
    /// containers are not ids.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => number.as_i64().map(EntityId::Int),
            Value::String(s) => Some(EntityId::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            EntityId::Int(i) => Value::from(*i),
            EntityId::String(s) => Value::from(s.as_str()),
            EntityId::Composite(parts) => {
                Value::Array(parts.iter().map(EntityId::to_value).collect())
            }
        }
    }
}

impl From<i64> for EntityId {
    fn from(value: i64) -> Self {
        EntityId::Int(value)
    }
}

impl From<&str> for EntityId {
    fn from(value: &str) -> Self {
        EntityId::String(value.to_string())
    }
}

impl From<String> for EntityId {
    fn from(value: String) -> Self {
        EntityId::String(value)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityId::Int(i) => write!(f, "{i}"),
            EntityId::String(s) => f.write_str(s),
            EntityId::Composite(parts) => {
                for (index, part) in parts.iter().enumerate() {
                    if index > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{part}")?;
                }
                Ok(())
            }
        }
    }
}

/// Value of `field` when it is present and not null.
pub fn present<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|value| !value.is_null())
}

/// Render a value the way it appears in a URL path or query pair.
pub fn url_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
