use std::fmt;
use std::sync::Arc;

use futures::FutureExt;
use log::debug;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{RestError, Result};
use crate::rest::entity::{Record, url_value};
use crate::rest::transport::{HttpTransport, Method, PendingResponse, Transport, TransportRequest};

/// Whether the endpoint currently addresses one resource or a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    One,
    All,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::One => "one",
            Mode::All => "all",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    One { noun: String, id: Value },
    All { noun: String },
}

/// One or more `field:direction` order tokens, in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSpec(pub Vec<String>);

impl OrderSpec {
    /// Read a `$order` value: a single token or a list of tokens.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Array(items) => OrderSpec(items.iter().map(url_value).collect()),
            Value::Null => OrderSpec::default(),
            other => OrderSpec(vec![url_value(other)]),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for OrderSpec {
    fn from(token: &str) -> Self {
        OrderSpec(vec![token.to_string()])
    }
}

impl From<String> for OrderSpec {
    fn from(token: String) -> Self {
        OrderSpec(vec![token])
    }
}

impl From<Vec<String>> for OrderSpec {
    fn from(tokens: Vec<String>) -> Self {
        OrderSpec(tokens)
    }
}

impl From<&[&str]> for OrderSpec {
    fn from(tokens: &[&str]) -> Self {
        OrderSpec(tokens.iter().map(|token| token.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for OrderSpec {
    fn from(tokens: [&str; N]) -> Self {
        OrderSpec(tokens.iter().map(|token| token.to_string()).collect())
    }
}

/// Creates endpoint builders sharing one configuration and transport.
#[derive(Clone)]
pub struct Requester {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
}

impl Requester {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
        }
    }

    /// Requester backed by the reqwest transport.
    pub fn http(config: ClientConfig) -> Self {
        let transport = Arc::new(HttpTransport::new(&config));
        Self::new(config, transport)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Start a new, empty endpoint.
    pub fn request(&self) -> QueryBuilder {
        QueryBuilder {
            config: self.config.clone(),
            transport: self.transport.clone(),
            stack: Vec::new(),
            filters: Vec::new(),
            order: Vec::new(),
            limit: None,
            offset: None,
        }
    }
}

/// Fluent endpoint builder.
///
/// `one` and `all` push path segments; the last pushed segment decides the
/// mode. Filters, order, limit, offset and `post` need `all` mode; `put` and
/// `delete` need `one` mode. Violations fail with `InvalidMode` before any
/// request is made.
pub struct QueryBuilder {
    config: Arc<ClientConfig>,
    transport: Arc<dyn Transport>,
    stack: Vec<Segment>,
    filters: Vec<(String, Value)>,
    order: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl QueryBuilder {
    /// Appends `/{noun}/{id}`.
    pub fn one(mut self, noun: &str, id: impl Into<Value>) -> Self {
        self.stack.push(Segment::One {
            noun: noun.to_string(),
            id: id.into(),
        });
        self
    }

    /// Appends `/{noun}`.
    pub fn all(mut self, noun: &str) -> Self {
        self.stack.push(Segment::All {
            noun: noun.to_string(),
        });
        self
    }

    pub fn mode(&self) -> Option<Mode> {
        self.stack.last().map(|segment| match segment {
            Segment::One { .. } => Mode::One,
            Segment::All { .. } => Mode::All,
        })
    }

    /// Adds one filter pair; a list value adds one pair per element.
    pub fn filter(mut self, key: &str, value: impl Into<Value>) -> Result<Self> {
        self.require("filter", Mode::All)?;
        self.push_filter(key, value.into());
        Ok(self)
    }

    /// Adds every `key: value` of `filters`, in map order.
    pub fn filter_map(mut self, filters: &Record) -> Result<Self> {
        self.require("filter", Mode::All)?;
        for (key, value) in filters {
            self.push_filter(key, value.clone());
        }
        Ok(self)
    }

    pub fn order(mut self, spec: impl Into<OrderSpec>) -> Result<Self> {
        self.require("order", Mode::All)?;
        self.order.extend(spec.into().0);
        Ok(self)
    }

    pub fn limit(mut self, limit: u64) -> Result<Self> {
        self.require("limit", Mode::All)?;
        self.limit = Some(limit);
        Ok(self)
    }

    pub fn offset(mut self, offset: u64) -> Result<Self> {
        self.require("offset", Mode::All)?;
        self.offset = Some(offset);
        Ok(self)
    }

    /// Full URL: base, path segments, then `filter`, `order`, `limit` and
    /// `offset` params joined by `&`. Zero limit and offset are omitted.
    pub fn url(&self) -> String {
        let mut url = self.config.base_url.clone();

        for segment in &self.stack {
            match segment {
                Segment::One { noun, id } => {
                    url.push('/');
                    url.push_str(noun);
                    url.push('/');
                    url.push_str(&url_value(id));
                }
                Segment::All { noun } => {
                    url.push('/');
                    url.push_str(noun);
                }
            }
        }

        let mut params: Vec<String> = vec![];
        for (field, value) in &self.filters {
            params.push(format!("filter={}:{}", field, url_value(value)));
        }
        for token in &self.order {
            params.push(format!("order={}", token));
        }
        if let Some(limit) = self.limit.filter(|limit| *limit > 0) {
            params.push(format!("limit={}", limit));
        }
        if let Some(offset) = self.offset.filter(|offset| *offset > 0) {
            params.push(format!("offset={}", offset));
        }

        if !params.is_empty() {
            url.push('?');
            url.push_str(&params.join("&"));
        }

        url
    }

    /// GET the current endpoint.
    pub fn get(self) -> Result<PendingResponse> {
        Ok(self.dispatch(Method::Get, None))
    }

    /// POST `data` to the current collection.
    pub fn post(self, data: Record) -> Result<PendingResponse> {
        self.require("post", Mode::All)?;
        Ok(self.dispatch(Method::Post, Some(Value::Object(data))))
    }

    /// PUT `data` to the current resource.
    pub fn put(self, data: Record) -> Result<PendingResponse> {
        self.require("put", Mode::One)?;
        Ok(self.dispatch(Method::Put, Some(Value::Object(data))))
    }

    /// DELETE the current resource.
    pub fn delete(self) -> Result<PendingResponse> {
        self.require("delete", Mode::One)?;
        Ok(self.dispatch(Method::Delete, None))
    }

    fn require(&self, operation: &'static str, expected: Mode) -> Result<()> {
        match self.mode() {
            None => Err(RestError::EmptyStack { operation }),
            Some(mode) if mode == expected => Ok(()),
            Some(_) => Err(RestError::InvalidMode {
                operation,
                expected,
            }),
        }
    }

    fn push_filter(&mut self, key: &str, value: Value) {
        match value {
            Value::Array(items) => {
                for item in items {
                    self.filters.push((key.to_string(), item));
                }
            }
            value => self.filters.push((key.to_string(), value)),
        }
    }

    fn dispatch(self, method: Method, body: Option<Value>) -> PendingResponse {
        let request = TransportRequest {
            method,
            url: self.url(),
            body,
        };

        if self.config.is_debug() {
            debug!("{} {}", request.method, request.url);
        }

        let transport = self.transport;
        async move { transport.send(request).await }.boxed()
    }
}
