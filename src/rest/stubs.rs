//! In-memory stand-in for the REST backend, keyed by entity name. While an
//! entity is stubbed its reads are answered from the stub data with the same
//! filter, order and page rules the cache uses.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use log::warn;
use serde_json::Value;

use crate::error::{RestError, Result};
use crate::rest::collection::{get_all, get_page, matches_filters};
use crate::rest::crud::Fetched;
use crate::rest::descriptor::FetchMethod;
use crate::rest::entity::{ID_FIELD, Record, present};
use crate::rest::entitydefinition::EntityDefinition;

#[derive(Debug, Default)]
pub struct ApiStubs {
    entity_data: HashMap<String, Vec<Record>>,
    delay: Option<Duration>,
}

impl ApiStubs {
    /// Serve `entity` from `records`. Replaces an existing stub.
    pub fn stub_entity(&mut self, entity: &str, records: Vec<Record>) {
        if self.entity_data.contains_key(entity) {
            warn!("Stubbing entity {} which is already stubbed", entity);
        }
        self.entity_data.insert(entity.to_string(), records);
    }

    /// Stop stubbing `entity`.
    pub fn restore(&mut self, entity: &str) {
        self.entity_data.remove(entity);
    }

    /// Delay before every stub answer resolves.
    pub fn set_delay(&mut self, delay: Option<Duration>) {
        self.delay = delay;
    }

    pub fn is_stubbed(&self, entity: &str) -> bool {
        self.entity_data.contains_key(entity)
    }

    /// Answer a read, `None` when the entity is not stubbed. The stub data
    /// is copied out here; `deserialize` and the collection rules run when
    /// the returned future is polled.
    pub(crate) fn answer_fetch(
        &self,
        definition: &Arc<EntityDefinition>,
        method: FetchMethod,
        args: &Record,
    ) -> Option<BoxFuture<'static, Result<Fetched>>> {
        let data = self.entity_data.get(definition.entity())?.clone();
        let definition = definition.clone();
        let args = args.clone();
        let delay = self.delay;

        Some(
            async move {
                delay_for(delay).await;
                let data: Vec<Record> = data
                    .into_iter()
                    .map(|record| definition.deserialize_record(record))
                    .collect();
                query(&definition, data, method, &args)
            }
            .boxed(),
        )
    }

    /// Answer a save with the response body the server would send.
    pub(crate) fn answer_save(
        &self,
        definition: &EntityDefinition,
        instance: &Record,
    ) -> Option<BoxFuture<'static, Result<Value>>> {
        let data = self.entity_data.get(definition.entity())?;
        let now = Value::from(Utc::now().to_rfc3339());
        let mut saved = instance.clone();

        let outcome = if definition.is_relationship() {
            saved.insert("last_modified".to_string(), now);
            Ok(saved)
        } else if let Some(id) = present(instance, ID_FIELD) {
            // saving by id patches the existing record
            match data.iter().find(|record| record.get(ID_FIELD) == Some(id)) {
                Some(existing) => {
                    let mut patched = existing.clone();
                    patched.extend(saved);
                    patched.insert("last_modified".to_string(), now);
                    Ok(patched)
                }
                None => Err(RestError::Transport(format!(
                    "Cannot find existing {} by id to do PUT, id = {}",
                    definition.entity(),
                    id
                ))),
            }
        } else {
            let next_id = data
                .iter()
                .filter_map(|record| record.get(ID_FIELD).and_then(Value::as_i64))
                .max()
                .unwrap_or(0)
                + 1;
            saved.insert(ID_FIELD.to_string(), Value::from(next_id));
            saved.insert("created".to_string(), now.clone());
            saved.insert("last_modified".to_string(), now);
            Ok(saved)
        };

        Some(resolve(outcome.map(Value::Object), self.delay))
    }

    /// Answer a delete, `None` when the entity is not stubbed.
    pub(crate) fn answer_delete(&self, definition: &EntityDefinition) -> Option<BoxFuture<'static, Result<Value>>> {
        self.entity_data.get(definition.entity())?;
        Some(resolve(Ok(Value::Null), self.delay))
    }
}

fn query(definition: &EntityDefinition, data: Vec<Record>, method: FetchMethod, args: &Record) -> Result<Fetched> {
    match method {
        FetchMethod::Fetch => data
            .into_iter()
            .find(|record| matches_filters(record, args, definition))
            .map(|record| Fetched::One(Some(record)))
            .ok_or_else(|| {
                RestError::Transport(format!(
                    "no stubbed {} matches {}",
                    definition.entity(),
                    Value::Object(args.clone())
                ))
            }),
        FetchMethod::FetchPage if !definition.is_relationship() => {
            Ok(Fetched::Many(get_page(&data, definition, args)))
        }
        _ => Ok(Fetched::Many(get_all(&data, definition, args))),
    }
}

async fn delay_for(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

fn resolve<T: Send + 'static>(outcome: Result<T>, delay: Option<Duration>) -> BoxFuture<'static, Result<T>> {
    async move {
        delay_for(delay).await;
        outcome
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn records(value: Value) -> Vec<Record> {
        value
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item.as_object().cloned().unwrap())
            .collect()
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    fn stubs() -> ApiStubs {
        let mut stubs = ApiStubs::default();
        stubs.stub_entity(
            "projects",
            records(json!([
                {"id": 1, "name": "b", "account_id": 7},
                {"id": 2, "name": "a", "account_id": 7},
                {"id": 3, "name": "c", "account_id": 8}
            ])),
        );
        stubs
    }

    fn projects() -> EntityDefinition {
        EntityDefinition::builder("projects").build()
    }

    fn shared_projects() -> Arc<EntityDefinition> {
        Arc::new(projects())
    }

    #[test]
    fn unstubbed_entities_are_not_answered() {
        let definition = EntityDefinition::builder("audiences").build();
        assert!(stubs().answer_delete(&definition).is_none());
        assert!(!stubs().is_stubbed("audiences"));
    }

    #[tokio::test]
    async fn reads_follow_collection_rules() {
        let stubs = stubs();
        let args = record(json!({"account_id": 7, "$order": "name:asc"}));
        let fetched = stubs
            .answer_fetch(&shared_projects(), FetchMethod::FetchAll, &args)
            .unwrap()
            .await
            .unwrap();
        let ids: Vec<i64> = fetched.many().iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 1]);

        let missing = stubs
            .answer_fetch(&shared_projects(), FetchMethod::Fetch, &record(json!({"id": 99})))
            .unwrap()
            .await;
        assert!(matches!(missing, Err(RestError::Transport(_))));
    }

    #[tokio::test]
    async fn saves_assign_ids_and_patch_existing() {
        let stubs = stubs();

        let created = stubs
            .answer_save(&projects(), &record(json!({"name": "d"})))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(created["id"], json!(4));

        let patched = stubs
            .answer_save(&projects(), &record(json!({"id": 2, "name": "z"})))
            .unwrap()
            .await
            .unwrap();
        assert_eq!(patched["name"], json!("z"));
        assert_eq!(patched["account_id"], json!(7));

        let unknown = stubs
            .answer_save(&projects(), &record(json!({"id": 42})))
            .unwrap()
            .await;
        assert!(unknown.is_err());
    }
}
