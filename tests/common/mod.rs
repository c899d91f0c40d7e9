#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use rest_entity_store::rest::transport::{Method, Transport, TransportRequest};
use rest_entity_store::{
    ClientConfig, CrudDispatcher, EntityDefinition, Record, Requester, RestError, Store,
};
use serde_json::Value;
use tokio::sync::oneshot;

pub const BASE_URL: &str = "/api/v1";

/// Transport answering from canned responses and recording every request.
#[derive(Default)]
pub struct MockTransport {
    requests: Mutex<Vec<TransportRequest>>,
    responses: Mutex<HashMap<(Method, String), Result<Value, RestError>>>,
    held: Mutex<Vec<oneshot::Sender<()>>>,
    hold: AtomicBool,
}

impl MockTransport {
    pub fn respond(&self, method: Method, path: &str, response: Result<Value, RestError>) {
        self.responses
            .lock()
            .insert((method, format!("{BASE_URL}{path}")), response);
    }

    /// Keep requests pending until `release_all`.
    pub fn hold_responses(&self) {
        self.hold.store(true, Ordering::SeqCst);
    }

    /// Let the oldest held request resolve.
    pub fn release_next(&self) {
        let mut held = self.held.lock();
        if !held.is_empty() {
            let _ = held.remove(0).send(());
        }
    }

    pub fn release_all(&self) {
        self.hold.store(false, Ordering::SeqCst);
        for sender in self.held.lock().drain(..) {
            let _ = sender.send(());
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value, RestError> {
        self.requests.lock().push(request.clone());

        if self.hold.load(Ordering::SeqCst) {
            let (sender, receiver) = oneshot::channel();
            self.held.lock().push(sender);
            let _ = receiver.await;
        }

        match self.responses.lock().get(&(request.method, request.url.clone())) {
            Some(response) => response.clone(),
            None if request.method == Method::Delete => Ok(Value::Null),
            None => Err(RestError::Transport(format!(
                "no canned response for {} {}",
                request.method, request.url
            ))),
        }
    }
}

pub struct Harness {
    pub transport: Arc<MockTransport>,
    pub requester: Requester,
    pub store: Store,
}

impl Harness {
    pub fn new() -> Self {
        let transport = Arc::new(MockTransport::default());
        let requester = Requester::new(ClientConfig::new(BASE_URL), transport.clone());
        Self {
            transport,
            requester,
            store: Store::create(),
        }
    }

    pub fn dispatcher(&self, definition: EntityDefinition) -> CrudDispatcher {
        CrudDispatcher::new(definition, self.requester.clone(), self.store.clone())
    }
}

pub fn record(value: Value) -> Record {
    value.as_object().cloned().expect("record literal must be an object")
}

pub fn ids(records: &[Record]) -> Vec<i64> {
    records
        .iter()
        .map(|record| record["id"].as_i64().expect("numeric id"))
        .collect()
}

pub fn projects() -> EntityDefinition {
    EntityDefinition::builder("projects").build()
}

pub fn experiments() -> EntityDefinition {
    EntityDefinition::builder("experiments")
        .parent("projects", "project_id")
        .build()
}

pub fn relationship() -> EntityDefinition {
    EntityDefinition::builder("relationshipmodels")
        .parent("parent1s", "parent1_id")
        .parent("parent2s", "parent2_id")
        .build()
}
