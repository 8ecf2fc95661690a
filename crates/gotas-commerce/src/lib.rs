pub mod backend;
pub mod error;
pub mod http;
pub mod sandbox;
pub mod tools;

use std::sync::Arc;

use gotas_config::{BackendKind, GatewaySettings};

// Re-export commonly used types
pub use backend::{normalize_payment, CreatePaymentRequest, Credentials, PaymentBackend};
pub use error::{CommerceError, CommerceResult};
pub use http::HttpPaymentBackend;
pub use sandbox::SandboxBackend;
pub use tools::{register_payment_tools, CheckPaymentStatusHandler, CreatePaymentHandler};

/// Build the backend selected in settings
pub fn backend_from_settings(settings: &GatewaySettings) -> CommerceResult<Arc<dyn PaymentBackend>> {
    let backend: Arc<dyn PaymentBackend> = match settings.backend {
        BackendKind::Live => Arc::new(HttpPaymentBackend::new(settings.request_timeout())?),
        BackendKind::Sandbox => Arc::new(SandboxBackend::new()),
    };
    Ok(backend)
}
