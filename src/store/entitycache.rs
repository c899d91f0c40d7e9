use std::collections::HashMap;

use indexmap::IndexMap;
use log::warn;

use crate::rest::entity::{EntityId, Record};
use crate::rest::entitydefinition::EntityDefinition;

/// Records of one entity keyed by id, in first-merge order.
pub type EntitySection = IndexMap<EntityId, Record>;

/// Normalized cache: entity name → id → record.
///
/// Holds only records that were merged in. A merge replaces the previous
/// record for its id wholesale; fields are never combined.
#[derive(Debug, Default, Clone)]
pub struct EntityCache {
    sections: HashMap<String, EntitySection>,
}

impl EntityCache {
    /// Upsert `records` into the definition's section. Records without a key
    /// are skipped. Returns the number merged.
    pub fn merge<I>(&mut self, definition: &EntityDefinition, records: I) -> usize
    where
        I: IntoIterator<Item = Record>,
    {
        let section = self
            .sections
            .entry(definition.entity().to_string())
            .or_default();

        let mut merged = 0;
        for record in records {
            match definition.record_key(&record) {
                Some(key) => {
                    section.insert(key, record);
                    merged += 1;
                }
                None => warn!("Skipping {} record without a key", definition.entity()),
            }
        }
        merged
    }

    pub fn remove(&mut self, entity: &str, id: &EntityId) -> Option<Record> {
        self.sections.get_mut(entity)?.shift_remove(id)
    }

    /// Evict every record of `entity`.
    pub fn flush(&mut self, entity: &str) {
        self.sections.remove(entity);
    }

    pub fn section(&self, entity: &str) -> Option<&EntitySection> {
        self.sections.get(entity)
    }

    pub fn get(&self, entity: &str, id: &EntityId) -> Option<&Record> {
        self.sections.get(entity)?.get(id)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn projects() -> EntityDefinition {
        EntityDefinition::builder("projects").build()
    }

    #[test]
    fn merge_replaces_records_wholesale() {
        let mut cache = EntityCache::default();
        cache.merge(&projects(), [record(json!({"id": 1, "name": "a", "extra": true}))]);
        cache.merge(&projects(), [record(json!({"id": 1, "name": "b"}))]);

        let cached = cache.get("projects", &EntityId::Int(1)).unwrap();
        assert_eq!(cached, &record(json!({"id": 1, "name": "b"})));
    }

    #[test]
    fn keyless_records_are_skipped() {
        let mut cache = EntityCache::default();
        let merged = cache.merge(&projects(), [record(json!({"name": "a"})), record(json!({"id": 2}))]);
        assert_eq!(merged, 1);
        assert_eq!(cache.section("projects").unwrap().len(), 1);
    }

    #[test]
    fn flush_and_remove() {
        let mut cache = EntityCache::default();
        cache.merge(&projects(), [record(json!({"id": 1})), record(json!({"id": 2}))]);

        assert!(cache.remove("projects", &EntityId::Int(1)).is_some());
        assert!(cache.remove("experiments", &EntityId::Int(1)).is_none());
        assert_eq!(cache.section("projects").unwrap().len(), 1);

        cache.flush("projects");
        assert!(cache.section("projects").is_none());
    }
}
