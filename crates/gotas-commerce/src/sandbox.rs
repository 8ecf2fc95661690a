//! In-memory backend for local runs and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tracing::info;

use crate::backend::{CreatePaymentRequest, Credentials, PaymentBackend};
use crate::error::{CommerceError, CommerceResult};

/// Receiving wallet shown on sandbox payments
pub const SANDBOX_WALLET_ADDRESS: &str = "0x79Dc4e370298e0ff2563972c2d4e8350a31Fe851";

/// Minutes until a sandbox payment expires
const EXPIRY_MINUTES: i64 = 30;

/// Records payments in memory; ids are sequential (`pay_<hex>`) and every
/// payment stays `pending`.
#[derive(Debug, Default)]
pub struct SandboxBackend {
    next_id: AtomicU64,
    payments: Mutex<HashMap<String, Value>>,
}

impl SandboxBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.payments.lock().map(|p| p.len()).unwrap_or_else(|e| e.into_inner().len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PaymentBackend for SandboxBackend {
    fn name(&self) -> &'static str {
        "sandbox"
    }

    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
        credentials: &Credentials,
    ) -> CommerceResult<Value> {
        let sequence = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let payment_id = format!("pay_{:016x}", sequence);
        let now = Utc::now();

        let mut record = json!({
            "id": payment_id,
            "payment_id": payment_id,
            "amount": request.amount.to_string(),
            "currency": request.currency,
            "return_url": request.return_url,
            "status": "pending",
            "payment_url": format!("{}/pay?session={}", credentials.base_url, payment_id),
            "wallet_address": SANDBOX_WALLET_ADDRESS,
            "created_at": now.to_rfc3339(),
            "expires_at": (now + Duration::minutes(EXPIRY_MINUTES)).to_rfc3339(),
        });
        if let Some(description) = &request.description {
            record["description"] = json!(description);
        }

        self.payments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(payment_id.clone(), record.clone());
        info!("Sandbox payment created: {}", payment_id);
        Ok(record)
    }

    async fn payment_status(
        &self,
        payment_id: &str,
        _credentials: &Credentials,
    ) -> CommerceResult<Value> {
        self.payments
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(payment_id)
            .cloned()
            .ok_or_else(|| CommerceError::NotFound(payment_id.to_string()))
    }
}
