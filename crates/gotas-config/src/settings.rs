//! Gateway settings loaded from YAML/JSON files with `GOTAS_*` environment overrides

use crate::error::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://commerce.gotas.com";
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Supported file formats for settings files
#[derive(Debug, Clone, PartialEq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    /// Detect file format from extension
    pub fn from_path<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|s| s.to_str()) {
            Some("yaml") | Some("yml") => Ok(FileFormat::Yaml),
            Some("json") => Ok(FileFormat::Json),
            Some(ext) => Err(ConfigError::UnsupportedFormat(ext.to_string())),
            None => Err(ConfigError::UnsupportedFormat("no extension".to_string())),
        }
    }
}

/// Which payment backend the tool handlers talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The Gotas Commerce HTTP API
    #[default]
    Live,
    /// Deterministic in-memory backend for demos and tests
    Sandbox,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Live => "live",
            BackendKind::Sandbox => "sandbox",
        }
    }
}

impl FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(BackendKind::Live),
            "sandbox" => Ok(BackendKind::Sandbox),
            other => Err(ConfigError::InvalidValue {
                key: "backend".to_string(),
                reason: format!("expected 'live' or 'sandbox', got '{}'", other),
            }),
        }
    }
}

/// Process-level gateway settings.
///
/// Every field has a default, so a settings file only needs to name what it
/// changes. Environment variables are applied on top of the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    /// Listen address for the HTTP transport
    pub bind_addr: String,
    /// Path the MCP endpoint is mounted on
    pub mcp_path: String,
    pub server_name: String,
    pub server_version: String,
    pub server_description: String,
    /// Protocol version announced when the client does not ask for a supported one
    pub protocol_version: String,
    /// Upper bound for a single tool invocation
    pub tool_timeout_secs: u64,
    /// Maximum number of tool invocations running at once
    pub max_concurrency: usize,
    /// Sessions idle longer than this are swept; `None` disables expiry
    pub session_idle_secs: Option<u64>,
    pub sweep_interval_secs: u64,
    pub backend: BackendKind,
    /// Default Gotas Commerce API base URL
    pub base_url: String,
    /// Per-request timeout for backend HTTP calls
    pub request_timeout_secs: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
            mcp_path: "/mcp".to_string(),
            server_name: "Gotas Commerce".to_string(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
            server_description: "Cryptocurrency payment gateway for USDT transactions".to_string(),
            protocol_version: DEFAULT_PROTOCOL_VERSION.to_string(),
            tool_timeout_secs: 30,
            max_concurrency: 10,
            session_idle_secs: Some(3600),
            sweep_interval_secs: 60,
            backend: BackendKind::Live,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
        }
    }
}

impl GatewaySettings {
    /// Load settings from a YAML or JSON file, then validate
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let format = FileFormat::from_path(path)?;
        debug!("Loading gateway settings from {}", path.display());

        let settings = Self::parse_content(&content, format)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parse settings content directly (no validation)
    pub fn parse_content(content: &str, format: FileFormat) -> ConfigResult<Self> {
        let settings = match format {
            FileFormat::Yaml => serde_yaml::from_str(content)?,
            FileFormat::Json => serde_json::from_str(content)?,
        };
        Ok(settings)
    }

    /// Apply `GOTAS_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides using an arbitrary lookup.
    ///
    /// `PORT` is honoured for hosting platforms that only hand out a port;
    /// `GOTAS_BIND_ADDR` wins when both are set.
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            let port: u16 = parse_value("PORT", &port)?;
            self.bind_addr = format!("0.0.0.0:{}", port);
        }
        if let Some(addr) = get("GOTAS_BIND_ADDR") {
            self.bind_addr = addr;
        }
        if let Some(url) = get("GOTAS_BASE_URL") {
            self.base_url = url;
        }
        if let Some(backend) = get("GOTAS_BACKEND") {
            self.backend = backend.parse()?;
        }
        if let Some(v) = get("GOTAS_TOOL_TIMEOUT_SECS") {
            self.tool_timeout_secs = parse_value("GOTAS_TOOL_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("GOTAS_MAX_CONCURRENCY") {
            self.max_concurrency = parse_value("GOTAS_MAX_CONCURRENCY", &v)?;
        }
        if let Some(v) = get("GOTAS_SESSION_IDLE_SECS") {
            let secs: u64 = parse_value("GOTAS_SESSION_IDLE_SECS", &v)?;
            self.session_idle_secs = if secs == 0 { None } else { Some(secs) };
        }
        Ok(())
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::Validation(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.tool_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "tool_timeout_secs must be at least 1".to_string(),
            ));
        }
        if !self.mcp_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "mcp_path must start with '/', got '{}'",
                self.mcp_path
            )));
        }
        let trimmed = self.mcp_path.trim_end_matches('/');
        if trimmed.is_empty() || trimmed == "/health" {
            return Err(ConfigError::Validation(format!(
                "mcp_path '{}' collides with the health routes",
                self.mcp_path
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ConfigError::Validation(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        Ok(())
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn session_idle(&self) -> Option<Duration> {
        self.session_idle_secs.map(Duration::from_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> ConfigResult<T>
where
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}
