//! Error handling for the tool gateway

use std::time::Duration;

use serde_json::json;
use thiserror::Error;

use crate::handler::HandlerError;
use crate::jsonrpc::{
    RpcError, INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, NOT_IMPLEMENTED, TIMEOUT,
    UNAUTHORIZED,
};

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur while dispatching a call
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid parameters for tool {tool}: {}", .violations.join("; "))]
    InvalidParams { tool: String, violations: Vec<String> },

    #[error("Invalid request parameters: {0}")]
    InvalidRequestParams(String),

    #[error("Tool {tool} requires configuration: {}", .missing.join(", "))]
    Unauthorized { tool: String, missing: Vec<String> },

    #[error("Tool {0} has no handler")]
    NotImplemented(String),

    #[error("Tool {tool} failed: {source}")]
    Handler {
        tool: String,
        #[source]
        source: HandlerError,
    },

    #[error("Tool {tool} timed out after {}s", .after.as_secs())]
    Timeout { tool: String, after: Duration },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Convert to the JSON-RPC error object sent to the caller.
    ///
    /// Handler and internal failures are reported with a generic message;
    /// their detail is logged by the dispatcher, not leaked here beyond the
    /// handler's own message.
    pub fn to_rpc_error(&self) -> RpcError {
        match self {
            GatewayError::MethodNotFound(method) => RpcError::new(METHOD_NOT_FOUND, "Method not found")
                .with_data(json!({ "method": method })),
            GatewayError::ToolNotFound(tool) => {
                RpcError::new(METHOD_NOT_FOUND, format!("Tool not found: {}", tool))
                    .with_data(json!({ "tool": tool }))
            }
            GatewayError::InvalidParams { tool, violations } => {
                RpcError::new(INVALID_PARAMS, "Invalid params")
                    .with_data(json!({ "tool": tool, "violations": violations }))
            }
            GatewayError::InvalidRequestParams(msg) => {
                RpcError::new(INVALID_PARAMS, "Invalid params").with_data(json!({ "message": msg }))
            }
            GatewayError::Unauthorized { tool, missing } => RpcError::new(
                UNAUTHORIZED,
                format!("Unauthorized: {} is required to invoke tools", missing.join(", ")),
            )
            .with_data(json!({ "tool": tool, "missing": missing })),
            GatewayError::NotImplemented(tool) => {
                RpcError::new(NOT_IMPLEMENTED, format!("Tool not implemented: {}", tool))
                    .with_data(json!({ "tool": tool }))
            }
            GatewayError::Handler { tool, source } => {
                RpcError::new(INTERNAL_ERROR, "Tool execution failed")
                    .with_data(json!({ "tool": tool, "message": source.message() }))
            }
            GatewayError::Timeout { tool, after } => RpcError::new(TIMEOUT, "Tool execution timed out")
                .with_data(json!({ "tool": tool, "timeoutSecs": after.as_secs() })),
            _ => RpcError::new(INTERNAL_ERROR, "Internal error"),
        }
    }
}
