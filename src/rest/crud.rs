use std::sync::Arc;

use futures::FutureExt;
use futures::future::{self, BoxFuture, Shared};
use log::{debug, warn};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::error::{RestError, Result};
use crate::rest::collection::{self, LIMIT_KEY, count_of};
use crate::rest::descriptor::{Descriptor, FetchMethod, normalize_args};
use crate::rest::entity::{EntityId, Record};
use crate::rest::entitydefinition::EntityDefinition;
use crate::rest::parse::{parse_record, parse_records};
use crate::rest::querybuilder::Requester;
use crate::rest::routes::{self, Call};
use crate::store::{EntityCache, EntitySection, Store, Ticket};

/// Result of a read.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// `fetch`; `None` when answered from a cache that lacks the record.
    One(Option<Record>),
    /// `fetchAll` and `fetchPage`.
    Many(Vec<Record>),
}

impl Fetched {
    pub fn one(self) -> Option<Record> {
        match self {
            Fetched::One(record) => record,
            Fetched::Many(records) => records.into_iter().next(),
        }
    }

    pub fn many(self) -> Vec<Record> {
        match self {
            Fetched::One(record) => record.into_iter().collect(),
            Fetched::Many(records) => records,
        }
    }

    pub fn records(&self) -> &[Record] {
        match self {
            Fetched::One(Some(record)) => std::slice::from_ref(record),
            Fetched::One(None) => &[],
            Fetched::Many(records) => records,
        }
    }
}

/// Pending read. Every caller of the same in-flight request holds a clone of
/// the same handle and observes the same outcome.
pub type FetchHandle = Shared<BoxFuture<'static, Result<Fetched>>>;

/// Entry point for one entity definition: routes reads and writes onto the
/// endpoint builder, deduplicates identical in-flight reads and answers
/// completed reads from the shared cache.
#[derive(Clone)]
pub struct CrudDispatcher {
    definition: Arc<EntityDefinition>,
    requester: Requester,
    store: Store,
}

impl CrudDispatcher {
    pub fn new(definition: EntityDefinition, requester: Requester, store: Store) -> Self {
        Self {
            definition: Arc::new(definition),
            requester,
            store,
        }
    }

    pub fn definition(&self) -> &EntityDefinition {
        &self.definition
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Fetch one record by id, or a relationship record by its parent ids.
    pub fn fetch(&self, args: impl Into<Value>, force: bool) -> Result<FetchHandle> {
        self.execute(FetchMethod::Fetch, args.into(), force)
    }

    /// Fetch every record matching `filters` (`$order` honored).
    pub fn fetch_all(&self, filters: Record, force: bool) -> Result<FetchHandle> {
        self.execute(FetchMethod::FetchAll, Value::Object(filters), force)
    }

    /// Fetch one page of records. `$limit` is required, `$offset` defaults to 0.
    pub fn fetch_page(&self, filters: Record, force: bool) -> Result<FetchHandle> {
        if count_of(&filters, LIMIT_KEY).is_none() {
            return Err(RestError::MissingLimit);
        }
        self.execute(FetchMethod::FetchPage, Value::Object(filters), force)
    }

    /// Run a read through the ledger.
    ///
    /// An in-flight descriptor returns its pending handle. A completed one is
    /// answered from the cache unless `force` is set. Otherwise the request is
    /// issued and registered as in flight before this returns.
    pub fn execute(&self, method: FetchMethod, args: Value, force: bool) -> Result<FetchHandle> {
        let args = normalize_args(args);
        let descriptor = Descriptor::new(self.definition.entity(), method, &args);
        let trace = self.requester.config().is_debug();

        let mut state = self.store.lock();

        if let Some(pending) = state.ledger.in_flight(&descriptor) {
            if trace {
                debug!("{} already in flight", descriptor);
            }
            return Ok(pending);
        }

        if !force && state.ledger.is_completed(&descriptor) {
            if trace {
                debug!("{} answered from cache", descriptor);
            }
            let cached = simulate(&self.definition, &state.cache, method, &args);
            return Ok(future::ready(Ok(cached)).boxed().shared());
        }

        let call = self.route(method, &args)?;
        let request = match state.stubs.answer_fetch(&self.definition, method, &args) {
            Some(stubbed) => stubbed,
            None => self.send_fetch(call, method)?,
        };

        let store = self.store.clone();
        let definition = self.definition.clone();
        let key = descriptor.clone();
        let ticket = Ticket::next();
        let pending = async move {
            let outcome = request.await;
            {
                let mut state = store.lock();
                let current = state.ledger.finish(&key, ticket, outcome.is_ok());
                match &outcome {
                    Ok(_) if !current => debug!("{} resolved after a store reset, not merged", key),
                    Ok(fetched) => {
                        state.cache.merge(&definition, fetched.records().iter().cloned());
                    }
                    Err(e) => warn!("{} failed: {}", key, e),
                }
            }
            outcome
        }
        .boxed()
        .shared();

        state.ledger.start(descriptor, ticket, pending.clone());
        drop(state);

        spawn_detached(pending.clone());
        Ok(pending)
    }

    /// Persist `instance`: update when it has an id, create otherwise.
    /// `serialize` is applied to a copy; the caller's record is untouched.
    /// The returned record is deserialized and merged into the cache.
    pub fn save(&self, instance: &Record) -> Result<BoxFuture<'static, Result<Record>>> {
        let outbound = self.definition.serialize_record(instance);
        let call = routes::save(&self.requester, &self.definition, outbound.clone())?;
        let stubbed = self.store.lock().stubs.answer_save(&self.definition, &outbound);
        let response = match stubbed {
            Some(stubbed) => stubbed,
            None => self.trace(call).send()?,
        };

        let store = self.store.clone();
        let definition = self.definition.clone();
        Ok(detached(async move {
            let outcome = match response.await {
                Ok(json) => parse_record(json).map(|record| definition.deserialize_record(record)),
                Err(e) => Err(e),
            };
            match &outcome {
                Ok(record) => {
                    store.lock().cache.merge(&definition, [record.clone()]);
                }
                Err(e) => warn!("save {} failed: {}", definition.entity(), e),
            }
            outcome
        }))
    }

    /// Delete `instance` and drop it from the cache once the server agrees.
    pub fn delete(&self, instance: &Record) -> Result<BoxFuture<'static, Result<()>>> {
        let call = routes::delete(&self.requester, &self.definition, instance)?;
        let key = self.definition.record_key(instance);
        let stubbed = self.store.lock().stubs.answer_delete(&self.definition);
        let response = match stubbed {
            Some(stubbed) => stubbed,
            None => self.trace(call).send()?,
        };

        let store = self.store.clone();
        let definition = self.definition.clone();
        Ok(detached(async move {
            match response.await {
                Ok(_) => {
                    if let Some(key) = key {
                        store.lock().cache.remove(definition.entity(), &key);
                    }
                    Ok(())
                }
                Err(e) => {
                    warn!("delete {} failed: {}", definition.entity(), e);
                    Err(e)
                }
            }
        }))
    }

    /// Evict this entity's cache section.
    pub fn flush(&self) {
        self.store.flush(self.definition.entity());
    }

    /// Copy of this entity's cache section.
    pub fn entity_cache(&self) -> EntitySection {
        self.store.entity_cache(self.definition.entity())
    }

    pub fn by_id(&self, id: impl Into<EntityId>) -> Option<Record> {
        self.store.by_id(self.definition.entity(), &id.into())
    }

    fn route(&self, method: FetchMethod, args: &Record) -> Result<Call> {
        match method {
            FetchMethod::Fetch => routes::fetch(&self.requester, &self.definition, args),
            FetchMethod::FetchAll => routes::fetch_all(&self.requester, &self.definition, args),
            FetchMethod::FetchPage => routes::fetch_page(&self.requester, &self.definition, args),
        }
    }

    fn send_fetch(&self, call: Call, method: FetchMethod) -> Result<BoxFuture<'static, Result<Fetched>>> {
        let response = self.trace(call).send()?;
        let definition = self.definition.clone();
        Ok(async move {
            let json = response.await?;
            match method {
                FetchMethod::Fetch => {
                    let record = definition.deserialize_record(parse_record(json)?);
                    Ok(Fetched::One(Some(record)))
                }
                FetchMethod::FetchAll | FetchMethod::FetchPage => {
                    let records = parse_records(json)?
                        .into_iter()
                        .map(|record| definition.deserialize_record(record))
                        .collect();
                    Ok(Fetched::Many(records))
                }
            }
        }
        .boxed())
    }

    fn trace(&self, call: Call) -> Call {
        if self.requester.config().is_debug() {
            debug!("{} -> {:?} {}", self.definition.entity(), call.terminal, call.url());
        }
        call
    }
}

/// Drive `task` on the current tokio runtime so it runs to completion
/// whether or not anyone awaits it. Outside a runtime it stays lazy.
fn spawn_detached<F>(task: F)
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    if let Ok(runtime) = Handle::try_current() {
        runtime.spawn(task);
    }
}

/// Start `task` now and hand back a future of its outcome.
fn detached<T, F>(task: F) -> BoxFuture<'static, Result<T>>
where
    T: Clone + Send + Sync + 'static,
    F: Future<Output = Result<T>> + Send + 'static,
{
    let task = task.boxed().shared();
    spawn_detached(task.clone());
    task.boxed()
}

/// Recompute a completed read from the current cache.
fn simulate(
    definition: &EntityDefinition,
    cache: &EntityCache,
    method: FetchMethod,
    args: &Record,
) -> Fetched {
    let section = cache.section(definition.entity());
    match method {
        FetchMethod::Fetch => {
            let record = definition
                .record_key(args)
                .and_then(|key| section.and_then(|section| section.get(&key)))
                .cloned();
            Fetched::One(record)
        }
        FetchMethod::FetchPage if !definition.is_relationship() => {
            Fetched::Many(section.map_or_else(Vec::new, |section| {
                collection::get_page(section.values(), definition, args)
            }))
        }
        FetchMethod::FetchAll | FetchMethod::FetchPage => {
            Fetched::Many(section.map_or_else(Vec::new, |section| {
                collection::get_all(section.values(), definition, args)
            }))
        }
    }
}
