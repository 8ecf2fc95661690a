//! Gotas tool gateway
//!
//! Exposes a fixed catalog of payment tools over a JSON-RPC 2.0 envelope.
//! Discovery is always available; invocation requires tool configuration
//! (the `GOTAS_API_KEY` credential) and runs through a [`ToolHandler`].

pub mod app_state;
pub mod catalog;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod jsonrpc;
pub mod limits;
pub mod mcp;
pub mod server;
pub mod session;
pub mod sse;

// Re-export key types
pub use app_state::AppState;
pub use catalog::{payment_catalog, ParamType, ToolCatalog, ToolDefinition};
pub use dispatcher::{CallContext, Dispatcher, DispatcherBuilder};
pub use error::{GatewayError, GatewayResult};
pub use handler::{HandlerError, ToolHandler};
pub use jsonrpc::{RequestId, RpcError, RpcResponse};
pub use limits::InvocationLimits;
pub use mcp::ServerInfo;
pub use session::{Session, SessionRegistry};

pub use server::{build_router, serve_http, serve_stdio};
