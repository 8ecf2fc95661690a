use std::sync::Arc;
use std::time::Duration;

use gotas_commerce::{register_payment_tools, HttpPaymentBackend, SandboxBackend};
use gotas_config::{ToolConfig, API_KEY, BASE_URL};
use gotas_mcp::jsonrpc::{INTERNAL_ERROR, UNAUTHORIZED};
use gotas_mcp::{payment_catalog, CallContext, Dispatcher};
use httpmock::prelude::*;
use serde_json::{json, Value};

const DEFAULT_BASE: &str = "https://commerce.gotas.com";

fn sandbox_gateway() -> Dispatcher {
    register_payment_tools(
        Dispatcher::builder(payment_catalog()),
        Arc::new(SandboxBackend::new()),
        DEFAULT_BASE,
    )
    .build()
    .unwrap()
}

fn configured() -> CallContext {
    CallContext::new(ToolConfig::new().with(API_KEY, "sandbox-key"))
}

fn run_tool(id: u64, name: &str, parameters: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "run-tool",
        "params": {"name": name, "parameters": parameters}
    })
}

fn create_payment(id: u64) -> Value {
    run_tool(
        id,
        "create-payment",
        json!({"amount": 100.5, "currency": "USDT", "return_url": "https://shop.example/done"}),
    )
}

#[tokio::test]
async fn test_create_and_check_payment_in_sandbox() {
    let gateway = sandbox_gateway();

    let created = gateway.handle_value(create_payment(1), &configured()).await;
    let result = created.result().unwrap();
    let payment_id = result["payment_id"].as_str().unwrap().to_string();
    assert!(payment_id.starts_with("pay_"));
    assert_eq!(result["status"], "pending");
    assert_eq!(result["amount"], "100.5");
    assert!(result["expires_at"].is_string());

    let checked = gateway
        .handle_value(
            run_tool(2, "check-payment-status", json!({"payment_id": payment_id})),
            &configured(),
        )
        .await;
    assert_eq!(checked.result().unwrap()["payment_id"], payment_id.as_str());
}

#[tokio::test]
async fn test_sandbox_without_key_is_unauthorized() {
    let gateway = sandbox_gateway();
    let response = gateway.handle_value(create_payment(1), &CallContext::default()).await;
    assert_eq!(response.error().unwrap().code, UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_payment_is_handler_failure() {
    let gateway = sandbox_gateway();
    let response = gateway
        .handle_value(
            run_tool(3, "check-payment-status", json!({"payment_id": "pay_nope"})),
            &configured(),
        )
        .await;

    let error = response.error().unwrap();
    assert_eq!(error.code, INTERNAL_ERROR);
    assert_eq!(
        error.data.as_ref().unwrap()["message"],
        "Error checking payment: Payment not found: pay_nope"
    );
}

#[tokio::test]
async fn test_live_backend_through_gateway() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/payments")
                .header("x-api-key", "live-key");
            then.status(201).json_body(json!({"id": "b7e0", "status": "pending"}));
        })
        .await;

    let gateway = register_payment_tools(
        Dispatcher::builder(payment_catalog()),
        Arc::new(HttpPaymentBackend::new(Duration::from_secs(5)).unwrap()),
        DEFAULT_BASE,
    )
    .build()
    .unwrap();

    let ctx = CallContext::new(
        ToolConfig::new()
            .with(API_KEY, "live-key")
            .with(BASE_URL, server.base_url()),
    );
    let response = gateway.handle_value(create_payment(4), &ctx).await;

    mock.assert_async().await;
    let result = response.result().unwrap();
    assert_eq!(result["payment_id"], "b7e0");
    assert_eq!(result["status"], "pending");
}

#[tokio::test]
async fn test_live_backend_error_is_reported_without_url() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/payments");
            then.status(502).body("upstream down");
        })
        .await;

    let gateway = register_payment_tools(
        Dispatcher::builder(payment_catalog()),
        Arc::new(HttpPaymentBackend::new(Duration::from_secs(5)).unwrap()),
        DEFAULT_BASE,
    )
    .build()
    .unwrap();
    let ctx = CallContext::new(
        ToolConfig::new()
            .with(API_KEY, "live-key")
            .with(BASE_URL, server.base_url()),
    );

    let response = gateway.handle_value(create_payment(5), &ctx).await;
    let error = response.error().unwrap();
    assert_eq!(error.code, INTERNAL_ERROR);
    assert_eq!(
        error.data.as_ref().unwrap()["message"],
        "Error creating payment: HTTP 502 - upstream down"
    );
}
