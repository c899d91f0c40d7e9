use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use futures::future::BoxFuture;
use reqwest::Client;
use serde_json::Value;

use crate::config::ClientConfig;
use crate::error::{RestError, Result};

/// HTTP verb of a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

/// One request handed to the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

/// Decoded response body of a request that has been handed to the transport.
pub type PendingResponse = BoxFuture<'static, Result<Value>>;

/// Issues requests and yields decoded response bodies. Status codes never
/// leave the transport: a request either succeeds with a body or fails with
/// an opaque reason.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<Value>;
}

/// Transport over `reqwest`.
pub struct HttpTransport {
    client: Client,
    headers: HashMap<String, String>,
    bearer_token: Option<String>,
}

impl HttpTransport {
    /// Create a transport attaching the configured headers and token.
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: Client::new(),
            headers: config.headers.clone(),
            bearer_token: config.bearer_token.clone(),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<Value> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Put => self.client.put(&request.url),
            Method::Delete => self.client.delete(&request.url),
        };

        builder = builder.header("Accept", "application/json");
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| RestError::Transport(format!("{} {}: {e}", request.method, request.url)))?;

        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RestError::Transport(format!("API error ({}): {}", status, body)));
        }

        let text = resp
            .text()
            .await
            .map_err(|e| RestError::Transport(format!("Failed to read body: {e}")))?;

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&text)
            .map_err(|e| RestError::InvalidResponse(format!("Failed to parse JSON: {e}")))
    }
}
