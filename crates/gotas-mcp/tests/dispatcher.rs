use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gotas_config::{ToolConfig, API_KEY};
use gotas_mcp::catalog::{CHECK_PAYMENT_STATUS, CREATE_PAYMENT};
use gotas_mcp::jsonrpc::{
    INTERNAL_ERROR, INVALID_PARAMS, METHOD_NOT_FOUND, NOT_IMPLEMENTED, PARSE_ERROR, TIMEOUT,
    UNAUTHORIZED,
};
use gotas_mcp::{
    payment_catalog, CallContext, Dispatcher, HandlerError, InvocationLimits, RequestId,
    RpcResponse, ToolHandler,
};
use serde_json::{json, Map, Value};

/// Records calls and answers like a freshly created payment
#[derive(Default)]
struct RecordingHandler {
    calls: AtomicUsize,
}

#[async_trait]
impl ToolHandler for RecordingHandler {
    async fn invoke(
        &self,
        params: &Map<String, Value>,
        _config: &ToolConfig,
    ) -> Result<Value, HandlerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({
            "payment_id": "pay_0001",
            "status": "pending",
            "amount": params["amount"],
        }))
    }
}

struct FailingHandler;

#[async_trait]
impl ToolHandler for FailingHandler {
    async fn invoke(&self, _: &Map<String, Value>, _: &ToolConfig) -> Result<Value, HandlerError> {
        Err(HandlerError::with_source(
            "payment backend unavailable",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "tcp connect refused"),
        ))
    }
}

struct SlowHandler(Duration);

#[async_trait]
impl ToolHandler for SlowHandler {
    async fn invoke(&self, _: &Map<String, Value>, _: &ToolConfig) -> Result<Value, HandlerError> {
        tokio::time::sleep(self.0).await;
        Ok(json!({"status": "late"}))
    }
}

fn configured() -> CallContext {
    CallContext::new(ToolConfig::new().with(API_KEY, "test-key"))
}

fn unconfigured() -> CallContext {
    CallContext::default()
}

fn gateway_with(handler: Arc<dyn ToolHandler>) -> Dispatcher {
    Dispatcher::builder(payment_catalog())
        .handler(CREATE_PAYMENT, handler)
        .build()
        .unwrap()
}

fn create_payment_request(id: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "run-tool",
        "params": {
            "name": "create-payment",
            "parameters": {"amount": 100.5, "currency": "USDT", "return_url": "https://shop.example/done"}
        }
    })
}

fn error_code(response: &RpcResponse) -> i32 {
    response.error().expect("expected an error envelope").code
}

#[tokio::test]
async fn test_list_tools_without_configuration() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let response = gateway
        .handle_value(json!({"jsonrpc": "2.0", "id": 1, "method": "list-tools"}), &unconfigured())
        .await;

    let tools = response.result().unwrap()["tools"].as_array().unwrap().clone();
    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0]["name"], CREATE_PAYMENT);
    assert_eq!(
        tools[0]["inputSchema"]["required"],
        json!(["amount", "currency", "return_url"])
    );
    assert_eq!(tools[1]["name"], CHECK_PAYMENT_STATUS);
    assert_eq!(tools[1]["inputSchema"]["required"], json!(["payment_id"]));
}

#[tokio::test]
async fn test_list_tools_aliases_agree() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let canonical = gateway
        .handle_value(json!({"method": "list-tools"}), &unconfigured())
        .await;
    for alias in ["tools/list", "mcp.listTools", "listTools"] {
        let response = gateway
            .handle_value(json!({"method": alias}), &unconfigured())
            .await;
        assert_eq!(response.result(), canonical.result(), "alias {}", alias);
    }
}

#[tokio::test]
async fn test_configured_create_payment_succeeds() {
    let handler = Arc::new(RecordingHandler::default());
    let gateway = gateway_with(handler.clone());

    let response = gateway.handle_value(create_payment_request(json!(42)), &configured()).await;

    let result = response.result().unwrap();
    assert!(!result["payment_id"].as_str().unwrap().is_empty());
    assert_eq!(result["status"], "pending");
    assert_eq!(response.id(), &RequestId::from(42));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unconfigured_invocation_is_unauthorized() {
    let handler = Arc::new(RecordingHandler::default());
    let gateway = gateway_with(handler.clone());

    let response = gateway.handle_value(create_payment_request(json!("x")), &unconfigured()).await;

    assert_eq!(error_code(&response), UNAUTHORIZED);
    assert_eq!(response.error().unwrap().data.as_ref().unwrap()["missing"], json!([API_KEY]));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_api_key_counts_as_missing() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let ctx = CallContext::new(ToolConfig::new().with(API_KEY, "  "));
    let response = gateway.handle_value(create_payment_request(json!(1)), &ctx).await;
    assert_eq!(error_code(&response), UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let response = gateway
        .handle_value(
            json!({"id": 5, "method": "run-tool", "params": {"name": "unknown-tool", "parameters": {}}}),
            &configured(),
        )
        .await;

    let error = response.error().unwrap();
    assert_eq!(error.code, METHOD_NOT_FOUND);
    assert!(error.message.contains("unknown-tool"));
}

#[tokio::test]
async fn test_unknown_tool_checked_before_configuration() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let response = gateway
        .handle_value(json!({"tool": "unknown-tool", "arguments": {}}), &unconfigured())
        .await;
    assert_eq!(error_code(&response), METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_invalid_params_reported_before_authorization() {
    let handler = Arc::new(RecordingHandler::default());
    let gateway = gateway_with(handler.clone());
    let response = gateway
        .handle_value(
            json!({"method": "tools/call", "params": {"name": "create-payment", "arguments": {"amount": "ten"}}}),
            &unconfigured(),
        )
        .await;

    let error = response.error().unwrap();
    assert_eq!(error.code, INVALID_PARAMS);
    let violations = error.data.as_ref().unwrap()["violations"].as_array().unwrap();
    assert_eq!(violations.len(), 3);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_tool_name_is_invalid_params() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let response = gateway
        .handle_value(json!({"method": "run-tool", "params": {}}), &configured())
        .await;
    assert_eq!(error_code(&response), INVALID_PARAMS);
}

#[tokio::test]
async fn test_tool_without_handler_is_not_implemented() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let response = gateway
        .handle_value(
            json!({"method": "run-tool", "params": {"name": "check-payment-status", "parameters": {"payment_id": "pay_1"}}}),
            &configured(),
        )
        .await;
    assert_eq!(error_code(&response), NOT_IMPLEMENTED);
}

#[tokio::test]
async fn test_handler_failure_is_internal_error_without_detail() {
    let gateway = gateway_with(Arc::new(FailingHandler));
    let response = gateway.handle_value(create_payment_request(json!(9)), &configured()).await;

    let error = response.error().unwrap();
    assert_eq!(error.code, INTERNAL_ERROR);
    assert_eq!(error.message, "Tool execution failed");
    let data = error.data.as_ref().unwrap().to_string();
    assert!(data.contains("payment backend unavailable"));
    assert!(!data.contains("tcp connect refused"));
}

#[tokio::test]
async fn test_slow_handler_times_out() {
    let gateway = Dispatcher::builder(payment_catalog())
        .handler(CREATE_PAYMENT, Arc::new(SlowHandler(Duration::from_secs(5))))
        .limits(InvocationLimits::new(2, Duration::from_millis(50)))
        .build()
        .unwrap();

    let response = gateway.handle_value(create_payment_request(json!(3)), &configured()).await;
    assert_eq!(error_code(&response), TIMEOUT);
    assert_eq!(gateway.limits().available_permits(), 2);
}

#[tokio::test]
async fn test_concurrency_limit_serializes_calls() {
    let gateway = Arc::new(
        Dispatcher::builder(payment_catalog())
            .handler(CREATE_PAYMENT, Arc::new(SlowHandler(Duration::from_millis(100))))
            .limits(InvocationLimits::new(1, Duration::from_millis(150)))
            .build()
            .unwrap(),
    );

    let first = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            gateway.handle_value(create_payment_request(json!(1)), &configured()).await
        })
    };
    let second = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            gateway.handle_value(create_payment_request(json!(2)), &configured()).await
        })
    };

    let first = first.await.unwrap();
    let second = second.await.unwrap();
    assert!(!first.is_error());
    // the timeout covers the handler only, not the wait for a permit
    assert!(!second.is_error());
}

#[tokio::test]
async fn test_unknown_method() {
    let handler = Arc::new(RecordingHandler::default());
    let gateway = gateway_with(handler.clone());
    gateway.sessions().create();
    let sessions_before = gateway.sessions().len();
    let tools_before = gateway.list_tools();

    let response = gateway
        .handle_value(json!({"id": "m", "method": "payments/refund"}), &configured())
        .await;
    let error = response.error().unwrap();
    assert_eq!(error.code, METHOD_NOT_FOUND);
    assert_eq!(error.data.as_ref().unwrap()["method"], "payments/refund");

    // no session or catalog side effects
    assert_eq!(gateway.sessions().len(), sessions_before);
    assert_eq!(gateway.list_tools(), tools_before);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_tool_name_is_not_a_method() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let response = gateway
        .handle_value(json!({"method": "create-payment"}), &configured())
        .await;
    assert_eq!(error_code(&response), METHOD_NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_bytes_become_parse_error() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let bodies: [&[u8]; 4] = [b"{oops", b"[]", b"42", b"{\"id\": 1}"];
    for body in bodies {
        let response = gateway.handle_bytes(body, &configured()).await;
        assert_eq!(error_code(&response), PARSE_ERROR);
    }
}

#[tokio::test]
async fn test_ids_round_trip() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let cases = [
        (json!("abc-123"), RequestId::from("abc-123")),
        (json!(17), RequestId::from(17)),
        (Value::Null, RequestId::from("1")),
    ];
    for (raw, expected) in cases {
        let response = gateway
            .handle_value(json!({"id": raw.clone(), "method": "list-tools"}), &unconfigured())
            .await;
        assert_eq!(response.id(), &expected);

        let response = gateway
            .handle_value(json!({"id": raw, "method": "nope"}), &unconfigured())
            .await;
        assert_eq!(response.id(), &expected);
    }

    let response = gateway.handle_value(json!({"method": "ping"}), &unconfigured()).await;
    assert_eq!(response.id(), &RequestId::from("1"));
    assert_eq!(response.result(), Some(&json!({})));
}

#[tokio::test]
async fn test_initialize_creates_session() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let response = gateway
        .handle_value(
            json!({"id": 1, "method": "initialize", "params": {"protocolVersion": "2024-11-05"}}),
            &unconfigured(),
        )
        .await;

    let result = response.result().unwrap();
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "Gotas Commerce");
    assert!(result["capabilities"]["tools"].is_object());
    let session_id = result["sessionId"].as_str().unwrap();
    assert!(gateway.sessions().get(session_id).is_some());
}

#[tokio::test]
async fn test_requests_touch_transport_session() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let session_id = gateway.sessions().create();
    let created = gateway.sessions().get(&session_id).unwrap().last_active_at;

    tokio::time::sleep(Duration::from_millis(5)).await;
    let ctx = unconfigured().with_session(Some(session_id.clone()));
    gateway.handle_value(json!({"method": "ping"}), &ctx).await;

    assert!(gateway.sessions().get(&session_id).unwrap().last_active_at > created);
}

#[tokio::test]
async fn test_terminate_is_idempotent() {
    let gateway = gateway_with(Arc::new(RecordingHandler::default()));
    let session_id = gateway.sessions().create();

    let request = json!({"method": "terminate", "params": {"sessionId": session_id}});
    let first = gateway.handle_value(request.clone(), &unconfigured()).await;
    let second = gateway.handle_value(request, &unconfigured()).await;

    assert_eq!(first.result(), second.result());
    assert_eq!(first.result().unwrap()["success"], true);
    assert!(gateway.sessions().is_empty());

    // session id from the transport
    let other = gateway.sessions().create();
    let ctx = unconfigured().with_session(Some(other.clone()));
    let response = gateway.handle_value(json!({"method": "session/terminate"}), &ctx).await;
    assert_eq!(response.result().unwrap()["message"], "Session closed successfully");
    assert!(gateway.sessions().get(&other).is_none());
}

#[test]
fn test_handler_for_unknown_tool_rejected() {
    let result = Dispatcher::builder(payment_catalog())
        .handler("refund-payment", Arc::new(RecordingHandler::default()))
        .build();
    assert!(result.is_err());
}
