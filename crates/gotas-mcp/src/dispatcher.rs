//! Dispatcher: routes decoded envelopes to catalog, sessions and handlers

use std::collections::HashMap;
use std::sync::Arc;

use gotas_config::{ToolConfig, API_KEY};
use serde_json::{json, Map, Value};
use tokio::time::timeout;
use tracing::{debug, error, warn};

use crate::catalog::ToolCatalog;
use crate::error::{GatewayError, GatewayResult};
use crate::handler::ToolHandler;
use crate::jsonrpc::{
    decode, decode_value, encode_error, encode_result, CallEnvelope, RpcResponse,
    TOOL_NAME_FIELDS, TOOL_PARAMETERS_FIELDS,
};
use crate::limits::InvocationLimits;
use crate::mcp::{
    InitializeResult, ServerInfo, METHOD_INITIALIZE, METHOD_LIST_TOOLS, METHOD_PING,
    METHOD_RUN_TOOL, METHOD_TERMINATE,
};
use crate::session::SessionRegistry;

const DEFAULT_INSTRUCTIONS: &str = "Use list-tools to discover the payment tools and run-tool \
     to invoke them. Tool invocation requires GOTAS_API_KEY.";

const SESSION_ID_FIELDS: &[&str] = &["sessionId", "session_id"];

/// Per-request inputs supplied by the transport
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Resolved tool configuration for this request
    pub config: ToolConfig,
    /// Session id carried by the transport, if any
    pub session_id: Option<String>,
}

impl CallContext {
    pub fn new(config: ToolConfig) -> Self {
        Self { config, session_id: None }
    }

    pub fn with_session(mut self, session_id: Option<String>) -> Self {
        self.session_id = session_id.filter(|s| !s.trim().is_empty());
        self
    }
}

/// Builder for [`Dispatcher`]
pub struct DispatcherBuilder {
    catalog: ToolCatalog,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    sessions: Option<Arc<SessionRegistry>>,
    limits: InvocationLimits,
    server_info: ServerInfo,
    instructions: Option<String>,
    required_config: Vec<String>,
}

impl DispatcherBuilder {
    pub fn new(catalog: ToolCatalog) -> Self {
        Self {
            catalog,
            handlers: HashMap::new(),
            sessions: None,
            limits: InvocationLimits::default(),
            server_info: ServerInfo::default(),
            instructions: Some(DEFAULT_INSTRUCTIONS.to_string()),
            required_config: vec![API_KEY.to_string()],
        }
    }

    /// Attach the handler for a catalog tool
    pub fn handler(mut self, tool: impl Into<String>, handler: Arc<dyn ToolHandler>) -> Self {
        self.handlers.insert(tool.into(), handler);
        self
    }

    pub fn sessions(mut self, sessions: Arc<SessionRegistry>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn limits(mut self, limits: InvocationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn server_info(mut self, server_info: ServerInfo) -> Self {
        self.server_info = server_info;
        self
    }

    pub fn instructions(mut self, instructions: Option<String>) -> Self {
        self.instructions = instructions;
        self
    }

    /// Configuration keys that must be present before any handler runs
    pub fn required_config(mut self, keys: Vec<String>) -> Self {
        self.required_config = keys;
        self
    }

    pub fn build(self) -> GatewayResult<Dispatcher> {
        if let Some(orphan) = self.handlers.keys().find(|name| !self.catalog.contains(name)) {
            return Err(GatewayError::Config(format!(
                "handler registered for unknown tool '{}'",
                orphan
            )));
        }
        Ok(Dispatcher {
            catalog: self.catalog,
            handlers: self.handlers,
            sessions: self.sessions.unwrap_or_default(),
            limits: self.limits,
            server_info: self.server_info,
            instructions: self.instructions,
            required_config: self.required_config,
        })
    }
}

/// Stateless router over the catalog, handlers and session registry.
///
/// Every call produces exactly one response envelope whose id is the
/// request id. Discovery never consults configuration; only invocation does.
pub struct Dispatcher {
    catalog: ToolCatalog,
    handlers: HashMap<String, Arc<dyn ToolHandler>>,
    sessions: Arc<SessionRegistry>,
    limits: InvocationLimits,
    server_info: ServerInfo,
    instructions: Option<String>,
    required_config: Vec<String>,
}

impl Dispatcher {
    pub fn builder(catalog: ToolCatalog) -> DispatcherBuilder {
        DispatcherBuilder::new(catalog)
    }

    pub fn catalog(&self) -> &ToolCatalog {
        &self.catalog
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    pub fn limits(&self) -> &InvocationLimits {
        &self.limits
    }

    /// Decode raw bytes and dispatch; malformed input becomes a ParseError envelope
    pub async fn handle_bytes(&self, body: &[u8], ctx: &CallContext) -> RpcResponse {
        match decode(body) {
            Ok(call) => self.dispatch(call, ctx).await,
            Err(e) => {
                warn!("Malformed request: {}", e.reason);
                e.into_response()
            }
        }
    }

    /// Decode an already-parsed JSON value and dispatch
    pub async fn handle_value(&self, value: Value, ctx: &CallContext) -> RpcResponse {
        match decode_value(value) {
            Ok(call) => self.dispatch(call, ctx).await,
            Err(e) => {
                warn!("Malformed request: {}", e.reason);
                e.into_response()
            }
        }
    }

    /// Route one decoded call to its operation
    pub async fn dispatch(&self, call: CallEnvelope, ctx: &CallContext) -> RpcResponse {
        debug!("Dispatching method: {}", call.method);

        if let Some(session_id) = &ctx.session_id {
            self.sessions.touch(session_id);
        }

        let outcome = match call.method.as_str() {
            METHOD_LIST_TOOLS => Ok(self.list_tools()),
            METHOD_INITIALIZE => self.initialize(&call.params),
            METHOD_RUN_TOOL => self.run_tool(&call.params, ctx).await,
            METHOD_TERMINATE => Ok(self.terminate(&call.params, ctx)),
            METHOD_PING => Ok(json!({})),
            other => Err(GatewayError::MethodNotFound(other.to_string())),
        };

        match outcome {
            Ok(result) => encode_result(call.id, result),
            Err(e) => {
                log_failure(&e);
                let rpc = e.to_rpc_error();
                encode_error(call.id, rpc.code, rpc.message, rpc.data)
            }
        }
    }

    /// Discovery payload: `{ tools: [...] }`
    pub fn list_tools(&self) -> Value {
        json!({ "tools": self.catalog.descriptors() })
    }

    /// Create a session and describe the server
    pub fn initialize(&self, params: &Map<String, Value>) -> GatewayResult<Value> {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        let result = InitializeResult {
            protocol_version: self.server_info.negotiate(requested),
            server_info: self.server_info.clone(),
            capabilities: json!({ "tools": {} }),
            instructions: self.instructions.clone(),
            session_id: self.sessions.create(),
        };
        Ok(serde_json::to_value(result)?)
    }

    /// Validate, authorize and invoke a tool
    pub async fn run_tool(&self, params: &Map<String, Value>, ctx: &CallContext) -> GatewayResult<Value> {
        let name = TOOL_NAME_FIELDS
            .iter()
            .find_map(|f| params.get(*f).and_then(Value::as_str))
            .ok_or_else(|| GatewayError::InvalidRequestParams("missing tool name".to_string()))?;

        let empty = Map::new();
        let arguments = match TOOL_PARAMETERS_FIELDS.iter().find_map(|f| params.get(*f)) {
            None | Some(Value::Null) => &empty,
            Some(Value::Object(map)) => map,
            Some(_) => {
                return Err(GatewayError::InvalidRequestParams(
                    "tool parameters must be an object".to_string(),
                ))
            }
        };

        let tool = self
            .catalog
            .get(name)
            .ok_or_else(|| GatewayError::ToolNotFound(name.to_string()))?;

        tool.validate(arguments).map_err(|violations| GatewayError::InvalidParams {
            tool: name.to_string(),
            violations,
        })?;

        let missing: Vec<String> = self
            .required_config
            .iter()
            .filter(|key| !ctx.config.has(key))
            .cloned()
            .collect();
        if !missing.is_empty() {
            return Err(GatewayError::Unauthorized { tool: name.to_string(), missing });
        }

        let handler = self
            .handlers
            .get(name)
            .ok_or_else(|| GatewayError::NotImplemented(name.to_string()))?;

        // Acquire concurrency permit
        let _permit = self
            .limits
            .concurrency_limiter
            .acquire()
            .await
            .map_err(|_| GatewayError::Internal("Failed to acquire concurrency permit".to_string()))?;

        debug!("Acquired concurrency permit for tool: {}", name);

        match timeout(self.limits.timeout, handler.invoke(arguments, &ctx.config)).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(source)) => Err(GatewayError::Handler { tool: name.to_string(), source }),
            Err(_) => Err(GatewayError::Timeout { tool: name.to_string(), after: self.limits.timeout }),
        }
    }

    /// End a session; always succeeds
    pub fn terminate(&self, params: &Map<String, Value>, ctx: &CallContext) -> Value {
        let session_id = SESSION_ID_FIELDS
            .iter()
            .find_map(|f| params.get(*f).and_then(Value::as_str))
            .or(ctx.session_id.as_deref());

        match session_id {
            Some(id) => {
                self.sessions.terminate(id);
            }
            None => debug!("Terminate without a session id"),
        }

        json!({ "success": true, "message": "Session closed successfully" })
    }
}

fn log_failure(e: &GatewayError) {
    match e {
        GatewayError::Handler { tool, source } => {
            let mut chain = source.to_string();
            let mut cause = std::error::Error::source(source);
            while let Some(c) = cause {
                chain.push_str(": ");
                chain.push_str(&c.to_string());
                cause = c.source();
            }
            error!("Tool '{}' failed: {}", tool, chain);
        }
        GatewayError::Timeout { tool, after } => {
            warn!("Tool '{}' timed out after {:?}", tool, after)
        }
        GatewayError::Unauthorized { tool, missing } => {
            warn!("Tool '{}' rejected, missing configuration: {:?}", tool, missing)
        }
        GatewayError::Internal(_) | GatewayError::Serialization(_) | GatewayError::Io(_) => {
            error!("Request failed: {}", e)
        }
        other => debug!("Request rejected: {}", other),
    }
}
