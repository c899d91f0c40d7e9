use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{RestError, Result};
use crate::rest::entity::{EntityId, ID_FIELD, Record, present};
use crate::rest::fieldtype::FieldType;

/// Record transform applied on the way out (`serialize`) or in (`deserialize`).
pub type Transform = Arc<dyn Fn(Record) -> Record + Send + Sync>;

/// Parent resource an entity is nested under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    /// Collection noun of the parent, e.g. `projects`.
    pub entity: String,
    /// Field of the child holding the parent's id, e.g. `project_id`.
    pub key: String,
}

impl ParentLink {
    pub fn new(entity: &str, key: &str) -> Self {
        Self {
            entity: entity.to_string(),
            key: key.to_string(),
        }
    }
}

/// How an entity maps onto REST paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityKind {
    /// Top-level collection identified by its own `id`.
    Root,
    /// Collection nested under one parent, identified by its own `id`.
    Nested(ParentLink),
    /// Identified by the composite of two or more parent keys, no own `id`.
    /// Order is significant for URL nesting.
    Relationship(Vec<ParentLink>),
}

/// Immutable configuration of one REST entity.
#[derive(Clone)]
pub struct EntityDefinition {
    entity: String,
    kind: EntityKind,
    field_types: HashMap<String, FieldType>,
    serialize: Option<Transform>,
    deserialize: Option<Transform>,
}

impl EntityDefinition {
    /// Start building a definition for the collection noun `entity`.
    pub fn builder(entity: &str) -> EntityDefinitionBuilder {
        EntityDefinitionBuilder {
            entity: entity.to_string(),
            parents: Vec::new(),
            field_types: HashMap::new(),
            serialize: None,
            deserialize: None,
        }
    }

    /// Parse the JSON form of a definition (`entity`, `parent` or `parents`,
    /// `fieldTypes`). Transforms cannot be expressed in JSON.
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: DefinitionConfig = serde_json::from_str(contents)
            .map_err(|e| RestError::Config(format!("Invalid entity definition: {e}")))?;
        Ok(config.into())
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    pub fn kind(&self) -> &EntityKind {
        &self.kind
    }

    pub fn is_relationship(&self) -> bool {
        matches!(self.kind, EntityKind::Relationship(_))
    }

    /// Declared parents in nesting order.
    pub fn parents(&self) -> &[ParentLink] {
        match &self.kind {
            EntityKind::Root => &[],
            EntityKind::Nested(parent) => std::slice::from_ref(parent),
            EntityKind::Relationship(parents) => parents,
        }
    }

    pub fn field_type(&self, field: &str) -> Option<FieldType> {
        self.field_types.get(field).copied()
    }

    pub fn field_types(&self) -> &HashMap<String, FieldType> {
        &self.field_types
    }

    /// Apply `serialize` to a copy of an outbound instance.
    pub fn serialize_record(&self, instance: &Record) -> Record {
        match &self.serialize {
            Some(serialize) => serialize(instance.clone()),
            None => instance.clone(),
        }
    }

    /// Apply `deserialize` to an inbound record.
    pub fn deserialize_record(&self, record: Record) -> Record {
        match &self.deserialize {
            Some(deserialize) => deserialize(record),
            None => record,
        }
    }

    /// Cache key of a record: its `id`, or for relationship entities the
    /// composite of all parent keys. `None` when any part is missing.
    pub fn record_key(&self, record: &Record) -> Option<EntityId> {
        match &self.kind {
            EntityKind::Relationship(parents) => parents
                .iter()
                .map(|parent| present(record, &parent.key).and_then(EntityId::from_value))
                .collect::<Option<Vec<_>>>()
                .map(EntityId::Composite),
            _ => present(record, ID_FIELD).and_then(EntityId::from_value),
        }
    }
}

impl fmt::Debug for EntityDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityDefinition")
            .field("entity", &self.entity)
            .field("kind", &self.kind)
            .field("field_types", &self.field_types)
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}

/// Builder for [`EntityDefinition`]; the kind is fixed by `build()`.
pub struct EntityDefinitionBuilder {
    entity: String,
    parents: Vec<ParentLink>,
    field_types: HashMap<String, FieldType>,
    serialize: Option<Transform>,
    deserialize: Option<Transform>,
}

impl EntityDefinitionBuilder {
    /// Append a parent link. Order matters for relationship URLs.
    pub fn parent(mut self, entity: &str, key: &str) -> Self {
        self.parents.push(ParentLink::new(entity, key));
        self
    }

    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.field_types.insert(name.to_string(), field_type);
        self
    }

    pub fn serialize<F>(mut self, transform: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(transform));
        self
    }

    pub fn deserialize<F>(mut self, transform: F) -> Self
    where
        F: Fn(Record) -> Record + Send + Sync + 'static,
    {
        self.deserialize = Some(Arc::new(transform));
        self
    }

    pub fn build(mut self) -> EntityDefinition {
        let kind = match self.parents.len() {
            0 => EntityKind::Root,
            1 => EntityKind::Nested(self.parents.remove(0)),
            _ => EntityKind::Relationship(self.parents),
        };
        EntityDefinition {
            entity: self.entity,
            kind,
            field_types: self.field_types,
            serialize: self.serialize,
            deserialize: self.deserialize,
        }
    }
}

/// JSON shape of an entity definition.
#[derive(Debug, Deserialize)]
struct DefinitionConfig {
    entity: String,
    #[serde(default)]
    parent: Option<ParentLink>,
    #[serde(default)]
    parents: Vec<ParentLink>,
    #[serde(rename = "fieldTypes", default)]
    field_types: HashMap<String, FieldType>,
}

impl From<DefinitionConfig> for EntityDefinition {
    fn from(config: DefinitionConfig) -> Self {
        let mut builder = EntityDefinition::builder(&config.entity);
        builder.parents = config.parent.into_iter().chain(config.parents).collect();
        builder.field_types = config.field_types;
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: serde_json::Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn kind_is_decided_by_parent_count() {
        let root = EntityDefinition::builder("projects").build();
        assert_eq!(root.kind(), &EntityKind::Root);

        let nested = EntityDefinition::builder("experiments")
            .parent("projects", "project_id")
            .build();
        assert_eq!(
            nested.kind(),
            &EntityKind::Nested(ParentLink::new("projects", "project_id"))
        );

        let relationship = EntityDefinition::builder("projectintegrations")
            .parent("projects", "project_id")
            .parent("integrations", "integration_id")
            .build();
        assert!(relationship.is_relationship());
        assert_eq!(relationship.parents().len(), 2);
    }

    #[test]
    fn parses_json_definition() {
        let definition = EntityDefinition::from_json(
            r#"{
                "entity": "dimensions",
                "parent": { "entity": "projects", "key": "project_id" },
                "fieldTypes": { "id": "number", "last_modified": "date" }
            }"#,
        )
        .unwrap();

        assert_eq!(definition.entity(), "dimensions");
        assert_eq!(definition.parents()[0].key, "project_id");
        assert_eq!(definition.field_type("last_modified"), Some(FieldType::Date));
        assert_eq!(definition.field_type("name"), None);
    }

    #[test]
    fn record_keys() {
        let simple = EntityDefinition::builder("projects").build();
        assert_eq!(
            simple.record_key(&record(json!({"id": 4, "name": "a"}))),
            Some(EntityId::Int(4))
        );
        assert_eq!(simple.record_key(&record(json!({"name": "a"}))), None);

        let relationship = EntityDefinition::builder("links")
            .parent("parent1s", "parent1_id")
            .parent("parent2s", "parent2_id")
            .build();
        assert_eq!(
            relationship.record_key(&record(json!({"parent2_id": 2, "parent1_id": 1}))),
            Some(EntityId::Composite(vec![EntityId::Int(1), EntityId::Int(2)]))
        );
        assert_eq!(relationship.record_key(&record(json!({"parent1_id": 1}))), None);
    }

    #[test]
    fn serialize_works_on_a_copy() {
        let definition = EntityDefinition::builder("audiences")
            .serialize(|mut record| {
                record.insert("conditions".to_string(), json!("[]"));
                record
            })
            .build();
        let instance = record(json!({"name": "a", "conditions": []}));

        let outbound = definition.serialize_record(&instance);

        assert_eq!(outbound["conditions"], json!("[]"));
        assert_eq!(instance["conditions"], json!([]));
    }
}
