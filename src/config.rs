use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::LogLevel;
use crate::error::{RestError, Result};

/// Settings shared by every endpoint built for one REST backend.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    /// Prefix of every URL, e.g. `/api/v1` or `https://host/api/v1`.
    #[serde(default)]
    pub base_url: String,
    /// Extra headers attached to every HTTP request.
    #[serde(default)]
    pub headers: HashMap<String, String>,
    /// Optional bearer token sent with every HTTP request.
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub log_level: LogLevel,
}

impl ClientConfig {
    /// Create a config for the given base URL with default settings.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_log_level(mut self, log_level: LogLevel) -> Self {
        self.log_level = log_level;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    /// Parse a config from JSON.
    pub fn from_json(contents: &str) -> Result<Self> {
        let mut config: ClientConfig = serde_json::from_str(contents)
            .map_err(|e| RestError::Config(format!("Invalid config JSON: {e}")))?;
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Ok(config)
    }

    /// Read and parse a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            RestError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    pub(crate) fn is_debug(&self) -> bool {
        matches!(self.log_level, LogLevel::Debug)
    }
}
