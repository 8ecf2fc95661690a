//! Per-request tool configuration.
//!
//! A [`ToolConfig`] is the read-only bag of credentials and options a tool
//! handler sees. It is assembled per request from the process environment and
//! from an optional caller-supplied blob (base64-encoded JSON object).

use crate::error::{ConfigError, ConfigResult};
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Credential required before any payment tool may run
pub const API_KEY: &str = "GOTAS_API_KEY";
/// Optional per-request override of the backend base URL
pub const BASE_URL: &str = "GOTAS_BASE_URL";

#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolConfig {
    values: BTreeMap<String, String>,
}

impl ToolConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Value for `key`, treating blank strings as absent
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn api_key(&self) -> Option<&str> {
        self.get(API_KEY)
    }

    pub fn base_url(&self) -> Option<&str> {
        self.get(BASE_URL)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(|k| k.as_str())
    }

    /// Build from a JSON object. Strings are kept, numbers and booleans are
    /// stringified, anything nested is skipped.
    pub fn from_json_object(object: &serde_json::Map<String, JsonValue>) -> Self {
        let mut config = Self::new();
        for (key, value) in object {
            match value {
                JsonValue::String(s) => config.insert(key.clone(), s.clone()),
                JsonValue::Number(n) => config.insert(key.clone(), n.to_string()),
                JsonValue::Bool(b) => config.insert(key.clone(), b.to_string()),
                _ => debug!("Skipping non-scalar config entry '{}'", key),
            }
        }
        config
    }

    /// Layer `self` over `fallback`: keys present (and non-blank) here win.
    pub fn layered_over(&self, fallback: &ToolConfig) -> ToolConfig {
        let mut merged = fallback.clone();
        for (key, value) in &self.values {
            if !value.trim().is_empty() || !merged.values.contains_key(key) {
                merged.values.insert(key.clone(), value.clone());
            }
        }
        merged
    }
}

// Values are credentials; only keys are printed.
impl fmt::Debug for ToolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolConfig")
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Source of process-level tool configuration
pub trait ConfigProvider: Send + Sync {
    fn tool_config(&self) -> ToolConfig;
}

/// Reads a fixed set of keys from the process environment on every call,
/// so credentials exported after startup are picked up.
#[derive(Debug, Clone)]
pub struct EnvConfigProvider {
    keys: Vec<String>,
}

impl Default for EnvConfigProvider {
    fn default() -> Self {
        Self::new(vec![API_KEY.to_string(), BASE_URL.to_string()])
    }
}

impl EnvConfigProvider {
    pub fn new(keys: Vec<String>) -> Self {
        Self { keys }
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn tool_config(&self) -> ToolConfig {
        let mut config = ToolConfig::new();
        for key in &self.keys {
            if let Ok(value) = std::env::var(key) {
                config.insert(key.clone(), value);
            }
        }
        config
    }
}

/// Fixed configuration, used when credentials come from settings or tests
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: ToolConfig,
}

impl StaticConfigProvider {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn tool_config(&self) -> ToolConfig {
        self.config.clone()
    }
}

/// Decode a caller-supplied config blob (base64 of a JSON object).
///
/// Standard and URL-safe alphabets are accepted, padded or not.
pub fn decode_config_blob(blob: &str) -> ConfigResult<ToolConfig> {
    let blob = blob.trim();
    let bytes = STANDARD
        .decode(blob)
        .or_else(|_| URL_SAFE.decode(blob))
        .or_else(|_| STANDARD_NO_PAD.decode(blob))
        .or_else(|_| URL_SAFE_NO_PAD.decode(blob))?;

    let value: JsonValue = serde_json::from_slice(&bytes)?;
    match value {
        JsonValue::Object(map) => Ok(ToolConfig::from_json_object(&map)),
        JsonValue::Array(_) => Err(ConfigError::NotAnObject("array")),
        JsonValue::String(_) => Err(ConfigError::NotAnObject("string")),
        JsonValue::Number(_) => Err(ConfigError::NotAnObject("number")),
        JsonValue::Bool(_) => Err(ConfigError::NotAnObject("boolean")),
        JsonValue::Null => Err(ConfigError::NotAnObject("null")),
    }
}

/// Combine process and request configuration. Process values win, so an
/// operator-provided key cannot be replaced by a caller.
pub fn resolve_tool_config(process: &ToolConfig, request: Option<&ToolConfig>) -> ToolConfig {
    match request {
        Some(request) => process.layered_over(request),
        None => process.clone(),
    }
}
