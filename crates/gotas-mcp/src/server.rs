//! HTTP and stdio transports for the gateway

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use crate::app_state::AppState;
use crate::dispatcher::{CallContext, Dispatcher};
use crate::error::{GatewayError, GatewayResult};
use crate::jsonrpc::{decode, encode_result, CallEnvelope, RequestId, RpcResponse};
use crate::mcp::{METHOD_INITIALIZE, SESSION_HEADER};
use crate::session::spawn_idle_sweeper;
use crate::sse::{keep_alive_stream, KEEP_ALIVE_INTERVAL};

const PROTOCOL_LABEL: &str = "MCP Streamable HTTP";

/// Query parameters accepted on MCP routes
#[derive(Debug, Default, Deserialize)]
pub struct McpQuery {
    /// Base64 JSON object with per-request tool configuration
    pub config: Option<String>,
    pub action: Option<String>,
    pub method: Option<String>,
    pub id: Option<String>,
}

/// Build the HTTP router for a gateway
pub fn build_router(state: AppState) -> Router {
    let mcp_path = state.settings.mcp_path.clone();
    let list_tools_path = format!("{}/list-tools", mcp_path.trim_end_matches('/'));

    Router::new()
        .route(&mcp_path, get(handle_get).post(handle_post).delete(handle_delete))
        .route(&list_tools_path, get(handle_list_tools))
        .route("/", get(handle_health))
        .route("/health", get(handle_health))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(SESSION_HEADER),
            header::ORIGIN,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([HeaderName::from_static(SESSION_HEADER)])
}

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn call_context(state: &AppState, headers: &HeaderMap, query: &McpQuery) -> CallContext {
    CallContext::new(state.request_config(query.config.as_deref()))
        .with_session(session_header(headers))
}

/// Attach `mcp-session-id` when an initialize call produced a session
fn envelope_response(status: StatusCode, response: RpcResponse, initialize: bool) -> Response {
    let mut headers = HeaderMap::new();
    if initialize {
        if let Some(id) = response
            .result()
            .and_then(|r| r.get("sessionId"))
            .and_then(Value::as_str)
            .and_then(|s| HeaderValue::from_str(s).ok())
        {
            headers.insert(SESSION_HEADER, id);
        }
    }
    (status, headers, Json(response)).into_response()
}

async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<McpQuery>,
    body: Bytes,
) -> Response {
    let ctx = call_context(&state, &headers, &query);
    match decode(&body) {
        Ok(call) => {
            let initialize = call.method == METHOD_INITIALIZE;
            let response = state.dispatcher.dispatch(call, &ctx).await;
            envelope_response(StatusCode::OK, response, initialize)
        }
        Err(e) => {
            warn!("Malformed request body: {}", e.reason);
            envelope_response(StatusCode::BAD_REQUEST, e.into_response(), false)
        }
    }
}

async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<McpQuery>,
) -> Response {
    if let Some(method) = query.action.as_deref().or(query.method.as_deref()) {
        let ctx = call_context(&state, &headers, &query);
        let id = query.id.as_deref().map(RequestId::from).unwrap_or_default();
        let call = CallEnvelope::new(id, method, Map::new());
        let initialize = call.method == METHOD_INITIALIZE;
        let response = state.dispatcher.dispatch(call, &ctx).await;
        return envelope_response(StatusCode::OK, response, initialize);
    }

    let wants_sse = headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/event-stream"))
        .unwrap_or(false);
    if wants_sse {
        debug!("Opening SSE keep-alive stream");
        return keep_alive_stream(KEEP_ALIVE_INTERVAL).into_response();
    }

    let info = state.dispatcher.server_info();
    let metadata = encode_result(
        RequestId::default(),
        json!({
            "name": info.name,
            "description": info.description,
            "version": info.version,
        }),
    );
    (StatusCode::OK, Json(metadata)).into_response()
}

async fn handle_delete(State(state): State<AppState>, headers: HeaderMap) -> Json<Value> {
    let ctx = CallContext::default().with_session(session_header(&headers));
    Json(state.dispatcher.terminate(&Map::new(), &ctx))
}

async fn handle_list_tools(
    State(state): State<AppState>,
    Query(query): Query<McpQuery>,
) -> Json<RpcResponse> {
    let id = query.id.as_deref().map(RequestId::from).unwrap_or_default();
    Json(encode_result(id, state.dispatcher.list_tools()))
}

async fn handle_health(State(state): State<AppState>) -> Json<Value> {
    let info = state.dispatcher.server_info();
    let mcp_path = state.settings.mcp_path.trim_end_matches('/').to_string();
    Json(json!({
        "status": "ok",
        "message": format!("{} MCP Server is running", info.name),
        "version": info.version,
        "protocol": PROTOCOL_LABEL,
        "endpoints": {
            "mcp": mcp_path,
            "listTools": format!("{}/list-tools", mcp_path),
            "health": "/health",
        },
        "sessions": state.dispatcher.sessions().len(),
    }))
}

/// Serve the gateway over HTTP until Ctrl-C or SIGTERM
pub async fn serve_http(state: AppState) -> GatewayResult<()> {
    let addr = state.settings.bind_addr.clone();
    info!("Starting {} gateway (HTTP mode) on {}", state.dispatcher.server_info().name, addr);
    log_limits(&state.dispatcher);

    let sweeper = state.settings.session_idle().map(|max_idle| {
        spawn_idle_sweeper(
            Arc::clone(state.dispatcher.sessions()),
            max_idle,
            state.settings.sweep_interval(),
        )
    });

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| GatewayError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("HTTP gateway listening on {}", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| GatewayError::Internal(format!("HTTP server error: {}", e)));

    if let Some(handle) = sweeper {
        handle.abort();
    }
    info!("HTTP gateway stopped");
    served
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

fn log_limits(dispatcher: &Dispatcher) {
    let limits = dispatcher.limits();
    info!(
        "Limits: max_concurrency={}, timeout={:?}",
        limits.max_concurrency, limits.timeout
    );
}

/// Serve the gateway over stdin/stdout.
///
/// Configuration comes from the process only; there is no request blob.
pub async fn serve_stdio(state: AppState) -> GatewayResult<()> {
    info!("Starting {} gateway (stdio mode)", state.dispatcher.server_info().name);
    log_limits(&state.dispatcher);

    let stdin = BufReader::new(tokio::io::stdin());
    let stdout = tokio::io::stdout();
    serve_lines(&state, stdin, stdout).await?;

    info!("Stdio gateway stopped");
    Ok(())
}

/// Answer newline-delimited JSON frames from `reader` on `writer` until EOF
pub async fn serve_lines<R, W>(state: &AppState, mut reader: R, mut writer: W) -> GatewayResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    // one session per stdio connection
    let mut session_id: Option<String> = None;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let frame = trim_frame(&buf);
        if frame.is_empty() {
            continue;
        }
        debug!("Processing frame: {}", String::from_utf8_lossy(frame));

        let ctx = CallContext::new(state.request_config(None)).with_session(session_id.clone());
        let response = match decode(frame) {
            Ok(call) => {
                let initialize = call.method == METHOD_INITIALIZE;
                let response = state.dispatcher.dispatch(call, &ctx).await;
                if initialize {
                    if let Some(id) = response
                        .result()
                        .and_then(|r| r.get("sessionId"))
                        .and_then(Value::as_str)
                    {
                        session_id = Some(id.to_string());
                    }
                }
                response
            }
            Err(e) => {
                warn!("Malformed frame: {}", e.reason);
                e.into_response()
            }
        };

        let mut out = serde_json::to_vec(&response)?;
        out.push(b'\n');
        writer.write_all(&out).await?;
        writer.flush().await?;
    }

    Ok(())
}

/// Strip surrounding ASCII whitespace (including `\r`) from a raw frame
fn trim_frame(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|b| !b.is_ascii_whitespace()).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !b.is_ascii_whitespace()).map_or(start, |i| i + 1);
    &bytes[start..end]
}
