//! Live backend for the Gotas Commerce REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde_json::Value;
use tracing::{debug, warn};

use crate::backend::{CreatePaymentRequest, Credentials, PaymentBackend};
use crate::error::{CommerceError, CommerceResult};

const PAYMENTS_PATH: &str = "/api/v1/payments";
const API_KEY_HEADER: &str = "x-api-key";

/// Talks to `{base_url}/api/v1/payments` with the caller's API key
#[derive(Debug, Clone)]
pub struct HttpPaymentBackend {
    client: Client,
}

impl HttpPaymentBackend {
    pub fn new(timeout: Duration) -> CommerceResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// `{base}/api/v1/payments/{id}` with the id percent-encoded as a single segment
    fn status_url(base_url: &str, payment_id: &str) -> CommerceResult<Url> {
        if payment_id.is_empty() || payment_id == "." || payment_id == ".." {
            return Err(CommerceError::InvalidRequest(format!(
                "invalid payment id '{}'",
                payment_id
            )));
        }
        let mut url = Url::parse(&format!("{}{}", base_url, PAYMENTS_PATH)).map_err(|e| {
            CommerceError::InvalidRequest(format!("invalid base URL '{}': {}", base_url, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                CommerceError::InvalidRequest(format!("base URL '{}' cannot carry a path", base_url))
            })?
            .push(payment_id);
        Ok(url)
    }

    /// Map non-2xx to `Api`, 404 to `NotFound`, otherwise parse the JSON body
    async fn read_json(response: Response, payment_id: Option<&str>) -> CommerceResult<Value> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<Value>().await?);
        }

        let body = response.text().await.unwrap_or_default();
        warn!("Gotas API returned HTTP {}", status.as_u16());
        match payment_id {
            Some(id) if status == reqwest::StatusCode::NOT_FOUND => {
                Err(CommerceError::NotFound(id.to_string()))
            }
            _ => Err(CommerceError::Api { status: status.as_u16(), body }),
        }
    }
}

#[async_trait]
impl PaymentBackend for HttpPaymentBackend {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn create_payment(
        &self,
        request: &CreatePaymentRequest,
        credentials: &Credentials,
    ) -> CommerceResult<Value> {
        let url = format!("{}{}", credentials.base_url, PAYMENTS_PATH);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(request)
            .send()
            .await?;

        Self::read_json(response, None).await
    }

    async fn payment_status(
        &self,
        payment_id: &str,
        credentials: &Credentials,
    ) -> CommerceResult<Value> {
        let url = Self::status_url(&credentials.base_url, payment_id)?;
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, &credentials.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        Self::read_json(response, Some(payment_id)).await
    }
}
