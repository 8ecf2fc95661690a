//! Tool handlers for the payment catalog

use std::sync::Arc;

use async_trait::async_trait;
use gotas_config::ToolConfig;
use gotas_mcp::catalog::{CHECK_PAYMENT_STATUS, CREATE_PAYMENT};
use gotas_mcp::{DispatcherBuilder, HandlerError, ToolHandler};
use serde_json::{Map, Value};
use tracing::info;

use crate::backend::{normalize_payment, CreatePaymentRequest, Credentials, PaymentBackend};
use crate::error::CommerceError;

fn handler_error(context: &str, e: CommerceError) -> HandlerError {
    let message = format!("{}: {}", context, caller_message(&e));
    HandlerError::with_source(message, e)
}

// Transport errors can embed URLs; callers only see the category.
fn caller_message(e: &CommerceError) -> String {
    match e {
        CommerceError::Http(inner) if inner.is_timeout() => "request to payment API timed out".into(),
        CommerceError::Http(_) => "payment API unreachable".into(),
        other => other.to_string(),
    }
}

/// `create-payment`
pub struct CreatePaymentHandler {
    backend: Arc<dyn PaymentBackend>,
    default_base_url: String,
}

impl CreatePaymentHandler {
    pub fn new(backend: Arc<dyn PaymentBackend>, default_base_url: impl Into<String>) -> Self {
        Self { backend, default_base_url: default_base_url.into() }
    }
}

#[async_trait]
impl ToolHandler for CreatePaymentHandler {
    async fn invoke(
        &self,
        params: &Map<String, Value>,
        config: &ToolConfig,
    ) -> Result<Value, HandlerError> {
        const CONTEXT: &str = "Error creating payment";
        let credentials = Credentials::from_config(config, &self.default_base_url)
            .map_err(|e| handler_error(CONTEXT, e))?;
        let request = CreatePaymentRequest::from_params(params).map_err(|e| handler_error(CONTEXT, e))?;

        let record = self
            .backend
            .create_payment(&request, &credentials)
            .await
            .and_then(normalize_payment)
            .map_err(|e| handler_error(CONTEXT, e))?;

        info!(
            "Payment created via {} backend: {}",
            self.backend.name(),
            record["payment_id"]
        );
        Ok(record)
    }
}

/// `check-payment-status`
pub struct CheckPaymentStatusHandler {
    backend: Arc<dyn PaymentBackend>,
    default_base_url: String,
}

impl CheckPaymentStatusHandler {
    pub fn new(backend: Arc<dyn PaymentBackend>, default_base_url: impl Into<String>) -> Self {
        Self { backend, default_base_url: default_base_url.into() }
    }
}

#[async_trait]
impl ToolHandler for CheckPaymentStatusHandler {
    async fn invoke(
        &self,
        params: &Map<String, Value>,
        config: &ToolConfig,
    ) -> Result<Value, HandlerError> {
        const CONTEXT: &str = "Error checking payment";
        let credentials = Credentials::from_config(config, &self.default_base_url)
            .map_err(|e| handler_error(CONTEXT, e))?;
        let payment_id = params
            .get("payment_id")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| HandlerError::new(format!("{}: payment_id is empty", CONTEXT)))?;

        self.backend
            .payment_status(payment_id, &credentials)
            .await
            .and_then(normalize_payment)
            .map_err(|e| handler_error(CONTEXT, e))
    }
}

/// Attach both payment handlers to a dispatcher builder
pub fn register_payment_tools(
    builder: DispatcherBuilder,
    backend: Arc<dyn PaymentBackend>,
    default_base_url: &str,
) -> DispatcherBuilder {
    builder
        .handler(
            CREATE_PAYMENT,
            Arc::new(CreatePaymentHandler::new(Arc::clone(&backend), default_base_url)),
        )
        .handler(
            CHECK_PAYMENT_STATUS,
            Arc::new(CheckPaymentStatusHandler::new(backend, default_base_url)),
        )
}
