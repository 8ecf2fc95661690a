//! MCP protocol constants and initialize payload types

use serde::{Deserialize, Serialize};

// MCP Protocol Versions
pub const PROTOCOL_VERSION_2024_11_05: &str = "2024-11-05";
pub const PROTOCOL_VERSION_2025_03_26: &str = "2025-03-26";
pub const LATEST_PROTOCOL_VERSION: &str = PROTOCOL_VERSION_2025_03_26;

pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] =
    &[PROTOCOL_VERSION_2024_11_05, PROTOCOL_VERSION_2025_03_26];

// Canonical method names (see `jsonrpc::canonical_method` for aliases)
pub const METHOD_LIST_TOOLS: &str = "list-tools";
pub const METHOD_INITIALIZE: &str = "initialize";
pub const METHOD_RUN_TOOL: &str = "run-tool";
pub const METHOD_TERMINATE: &str = "terminate";
pub const METHOD_PING: &str = "ping";

/// Transport header carrying the session id
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Identity announced in the initialize response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Version used when the client does not request a supported one
    #[serde(skip)]
    pub protocol_version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "Gotas Commerce".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            description: None,
            protocol_version: LATEST_PROTOCOL_VERSION.to_string(),
        }
    }
}

impl ServerInfo {
    pub fn from_settings(settings: &gotas_config::GatewaySettings) -> Self {
        Self {
            name: settings.server_name.clone(),
            version: settings.server_version.clone(),
            description: Some(settings.server_description.clone()),
            protocol_version: settings.protocol_version.clone(),
        }
    }

    /// Pick the protocol version for a session: the client's if supported,
    /// otherwise ours.
    pub fn negotiate(&self, requested: Option<&str>) -> String {
        match requested {
            Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v.to_string(),
            _ => self.protocol_version.clone(),
        }
    }
}

/// Result payload of `initialize`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub server_info: ServerInfo,
    pub capabilities: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub session_id: String,
}
