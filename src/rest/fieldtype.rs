use serde::{Deserialize, Serialize};

/// Declared type of an entity field. Selects the filter rule and the sort
/// comparator used when answering queries from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    String,
    Date,
    Boolean,
    Array,
    Object,
}
