//! JSON-RPC 2.0 envelope codec
//!
//! Inbound bodies arrive in several historical shapes (`method` vs `action` vs
//! `tool`, `params` vs `arguments`, assorted method aliases). [`decode`]
//! normalizes all of them into one [`CallEnvelope`] using the tables below, so
//! nothing past this module has to know about the aliases.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::mcp::{
    METHOD_INITIALIZE, METHOD_LIST_TOOLS, METHOD_PING, METHOD_RUN_TOOL, METHOD_TERMINATE,
};

pub const JSONRPC_VERSION: &str = "2.0";

// Error codes (from JSON-RPC 2.0 spec)
pub const PARSE_ERROR: i32 = -32700;
pub const METHOD_NOT_FOUND: i32 = -32601;
pub const INVALID_PARAMS: i32 = -32602;
pub const INTERNAL_ERROR: i32 = -32603;

// Application error codes (server range -32000..-32099)
pub const UNAUTHORIZED: i32 = -32000;
pub const NOT_IMPLEMENTED: i32 = -32001;
pub const TIMEOUT: i32 = -32002;

/// Id used when a request carries none
pub const DEFAULT_REQUEST_ID: &str = "1";

/// Fields that may name the method, in priority order
const METHOD_FIELDS: &[&str] = &["method", "action"];

/// Fields that may carry the parameter object, in priority order
const PARAMS_FIELDS: &[&str] = &["params", "arguments"];

/// Fields that may carry the tool name inside `run-tool` params
pub const TOOL_NAME_FIELDS: &[&str] = &["name", "tool"];

/// Fields that may carry the tool parameters inside `run-tool` params
pub const TOOL_PARAMETERS_FIELDS: &[&str] = &["parameters", "arguments"];

/// Every accepted method spelling mapped to its canonical name
const METHOD_ALIASES: &[(&str, &str)] = &[
    ("list-tools", METHOD_LIST_TOOLS),
    ("tools/list", METHOD_LIST_TOOLS),
    ("mcp.listTools", METHOD_LIST_TOOLS),
    ("listTools", METHOD_LIST_TOOLS),
    ("initialize", METHOD_INITIALIZE),
    ("mcp.initialize", METHOD_INITIALIZE),
    ("run-tool", METHOD_RUN_TOOL),
    ("tools/call", METHOD_RUN_TOOL),
    ("mcp.runTool", METHOD_RUN_TOOL),
    ("runTool", METHOD_RUN_TOOL),
    ("terminate", METHOD_TERMINATE),
    ("mcp.terminate", METHOD_TERMINATE),
    ("session/terminate", METHOD_TERMINATE),
    ("ping", METHOD_PING),
];

/// Resolve a method spelling to its canonical name, if it is a known alias
pub fn canonical_method(raw: &str) -> Option<&'static str> {
    METHOD_ALIASES
        .iter()
        .find(|(alias, _)| *alias == raw)
        .map(|(_, canonical)| *canonical)
}

/// JSON-RPC request id (string or number, echoed verbatim)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    String(String),
    Number(Number),
}

impl Default for RequestId {
    fn default() -> Self {
        RequestId::String(DEFAULT_REQUEST_ID.to_string())
    }
}

impl RequestId {
    /// Extract an id from a raw JSON value; null, missing or non-scalar ids
    /// fall back to the default.
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            Some(Value::String(s)) => RequestId::String(s.clone()),
            Some(Value::Number(n)) => RequestId::Number(n.clone()),
            Some(Value::Null) | None => RequestId::default(),
            Some(other) => {
                debug!("Ignoring non-scalar request id: {}", other);
                RequestId::default()
            }
        }
    }
}

impl From<&str> for RequestId {
    fn from(s: &str) -> Self {
        RequestId::String(s.to_string())
    }
}

impl From<i64> for RequestId {
    fn from(n: i64) -> Self {
        RequestId::Number(n.into())
    }
}

/// A decoded inbound call
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    pub id: RequestId,
    /// Canonical method name when the alias is known, otherwise the raw string
    pub method: String,
    pub params: Map<String, Value>,
}

impl CallEnvelope {
    pub fn new(id: RequestId, method: impl Into<String>, params: Map<String, Value>) -> Self {
        let method = method.into();
        let method = canonical_method(&method)
            .map(str::to_string)
            .unwrap_or(method);
        Self { id, method, params }
    }

    /// First non-null string among `fields` in params
    pub fn param_str(&self, fields: &[&str]) -> Option<&str> {
        fields
            .iter()
            .find_map(|f| self.params.get(*f).and_then(|v| v.as_str()))
    }
}

/// Why an inbound body could not become a [`CallEnvelope`].
///
/// Carries the id when one could be recovered so the error response still
/// correlates with the request.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeError {
    pub id: RequestId,
    pub reason: String,
}

impl DecodeError {
    fn new(id: RequestId, reason: impl Into<String>) -> Self {
        Self { id, reason: reason.into() }
    }

    /// Convert into the ParseError envelope returned to the caller
    pub fn into_response(self) -> RpcResponse {
        encode_error(
            self.id,
            PARSE_ERROR,
            "Parse error",
            Some(serde_json::json!({ "reason": self.reason })),
        )
    }
}

/// Decode raw bytes into a call envelope
pub fn decode(body: &[u8]) -> Result<CallEnvelope, DecodeError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| DecodeError::new(RequestId::default(), format!("invalid JSON: {}", e)))?;
    decode_value(value)
}

/// Decode an already-parsed JSON value into a call envelope
pub fn decode_value(value: Value) -> Result<CallEnvelope, DecodeError> {
    let mut object = match value {
        Value::Object(map) => map,
        Value::Array(_) => {
            return Err(DecodeError::new(
                RequestId::default(),
                "batch requests are not supported",
            ))
        }
        _ => {
            return Err(DecodeError::new(
                RequestId::default(),
                "request must be a JSON object",
            ))
        }
    };

    let id = RequestId::from_value(object.get("id"));

    let params = match take_first(&mut object, PARAMS_FIELDS) {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(_) => return Err(DecodeError::new(id, "params must be an object")),
    };

    if let Some(method) = first_non_empty_str(&object, METHOD_FIELDS) {
        return Ok(CallEnvelope::new(id, method, params));
    }

    // `{ "tool": "...", "arguments": {...} }` is shorthand for run-tool
    if let Some(tool) = first_non_empty_str(&object, &["tool"]) {
        let mut run_params = Map::new();
        run_params.insert("name".to_string(), Value::String(tool.to_string()));
        run_params.insert("parameters".to_string(), Value::Object(params));
        return Ok(CallEnvelope::new(id, METHOD_RUN_TOOL, run_params));
    }

    Err(DecodeError::new(id, "request has no method"))
}

fn take_first(object: &mut Map<String, Value>, fields: &[&str]) -> Option<Value> {
    fields.iter().find_map(|f| object.remove(*f))
}

fn first_non_empty_str<'a>(object: &'a Map<String, Value>, fields: &[&str]) -> Option<&'a str> {
    fields.iter().find_map(|f| {
        object
            .get(*f)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    })
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// JSON-RPC 2.0 response; exactly one of `result` / `error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RpcResponse {
    Success {
        jsonrpc: String,
        id: RequestId,
        result: Value,
    },
    Error {
        jsonrpc: String,
        id: RequestId,
        error: RpcError,
    },
}

impl RpcResponse {
    pub fn id(&self) -> &RequestId {
        match self {
            RpcResponse::Success { id, .. } | RpcResponse::Error { id, .. } => id,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            RpcResponse::Success { result, .. } => Some(result),
            RpcResponse::Error { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&RpcError> {
        match self {
            RpcResponse::Error { error, .. } => Some(error),
            RpcResponse::Success { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error().is_some()
    }
}

/// Create a successful response
pub fn encode_result(id: RequestId, payload: Value) -> RpcResponse {
    RpcResponse::Success { jsonrpc: JSONRPC_VERSION.to_string(), id, result: payload }
}

/// Create an error response
pub fn encode_error(
    id: RequestId,
    code: i32,
    message: impl Into<String>,
    data: Option<Value>,
) -> RpcResponse {
    RpcResponse::Error {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        error: RpcError { code, message: message.into(), data },
    }
}
