//! Application state shared by the transports

use std::sync::Arc;

use gotas_config::{
    decode_config_blob, resolve_tool_config, ConfigProvider, EnvConfigProvider, GatewaySettings,
    ToolConfig,
};
use tracing::warn;

use crate::dispatcher::Dispatcher;

/// Shared application state for the gateway
///
/// Holds the dispatcher together with the process-level configuration source
/// used to build each request's [`ToolConfig`].
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub config_provider: Arc<dyn ConfigProvider>,
    pub settings: Arc<GatewaySettings>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher, settings: GatewaySettings) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            config_provider: Arc::new(EnvConfigProvider::default()),
            settings: Arc::new(settings),
        }
    }

    pub fn with_config_provider(mut self, provider: Arc<dyn ConfigProvider>) -> Self {
        self.config_provider = provider;
        self
    }

    /// Merge process configuration with an optional per-request blob.
    ///
    /// A blob that fails to decode is logged and ignored.
    pub fn request_config(&self, blob: Option<&str>) -> ToolConfig {
        let process = self.config_provider.tool_config();
        let request = blob.filter(|b| !b.is_empty()).and_then(|b| match decode_config_blob(b) {
            Ok(config) => Some(config),
            Err(e) => {
                warn!("Ignoring undecodable config parameter: {}", e);
                None
            }
        });
        resolve_tool_config(&process, request.as_ref())
    }
}
