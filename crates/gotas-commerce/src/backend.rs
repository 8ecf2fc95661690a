//! Payment backend seam and the request/credential types it consumes

use async_trait::async_trait;
use gotas_config::{ToolConfig, API_KEY};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{CommerceError, CommerceResult};

/// Credentials for one backend call, resolved from the request's tool config
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub base_url: String,
}

impl Credentials {
    /// `default_base_url` applies when the config carries no `GOTAS_BASE_URL`
    pub fn from_config(config: &ToolConfig, default_base_url: &str) -> CommerceResult<Self> {
        let api_key = config
            .api_key()
            .ok_or(CommerceError::MissingCredential(API_KEY))?
            .to_string();
        let base_url = config
            .base_url()
            .unwrap_or(default_base_url)
            .trim_end_matches('/')
            .to_string();
        Ok(Self { api_key, base_url })
    }
}

// The key never reaches logs
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Body of a create-payment call. The API expects `amount` as a string.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreatePaymentRequest {
    #[serde(serialize_with = "amount_as_string")]
    pub amount: f64,
    pub currency: String,
    pub return_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn amount_as_string<S: Serializer>(amount: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&amount.to_string())
}

impl CreatePaymentRequest {
    /// Build from validated tool parameters
    pub fn from_params(params: &Map<String, Value>) -> CommerceResult<Self> {
        let amount = params
            .get("amount")
            .and_then(Value::as_f64)
            .ok_or_else(|| CommerceError::InvalidRequest("amount must be a number".into()))?;
        if !amount.is_finite() || amount <= 0.0 {
            return Err(CommerceError::InvalidRequest("amount must be positive".into()));
        }
        Ok(Self {
            amount,
            currency: required_str(params, "currency")?,
            return_url: required_str(params, "return_url")?,
            description: params
                .get("description")
                .and_then(Value::as_str)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
        })
    }
}

fn required_str(params: &Map<String, Value>, key: &str) -> CommerceResult<String> {
    params
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CommerceError::InvalidRequest(format!("{} must be a string", key)))
}

/// A Gotas Commerce payments API
#[async_trait]
pub trait PaymentBackend: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
        credentials: &Credentials,
    ) -> CommerceResult<Value>;

    async fn payment_status(&self, payment_id: &str, credentials: &Credentials)
        -> CommerceResult<Value>;
}

/// Ensure a payment record exposes `payment_id` and `status` at top level.
///
/// The API names the identifier `id`; it is copied to `payment_id` when that
/// key is absent. A record without a status is reported as `pending`.
pub fn normalize_payment(record: Value) -> CommerceResult<Value> {
    let mut object = match record {
        Value::Object(map) => map,
        other => {
            return Err(CommerceError::InvalidResponse(format!(
                "expected a JSON object, got {}",
                other
            )))
        }
    };

    if !object.contains_key("payment_id") {
        let id = match object.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                return Err(CommerceError::InvalidResponse(
                    "payment record has no identifier".into(),
                ))
            }
        };
        object.insert("payment_id".into(), Value::String(id));
    }
    if !object.get("status").map(Value::is_string).unwrap_or(false) {
        object.insert("status".into(), Value::String("pending".into()));
    }
    Ok(Value::Object(object))
}
