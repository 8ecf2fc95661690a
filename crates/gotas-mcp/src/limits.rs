//! Invocation limits for tool handlers

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// Timeout and concurrency bounds applied to every handler invocation
#[derive(Debug, Clone)]
pub struct InvocationLimits {
    /// Maximum concurrent executions
    pub max_concurrency: usize,
    /// Tool execution timeout
    pub timeout: Duration,
    /// Semaphore for concurrency control
    pub concurrency_limiter: Arc<Semaphore>,
}

impl InvocationLimits {
    pub fn new(max_concurrency: usize, timeout: Duration) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            max_concurrency,
            timeout,
            concurrency_limiter: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    pub fn from_settings(settings: &gotas_config::GatewaySettings) -> Self {
        Self::new(settings.max_concurrency, settings.tool_timeout())
    }

    pub fn available_permits(&self) -> usize {
        self.concurrency_limiter.available_permits()
    }
}

impl Default for InvocationLimits {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(30))
    }
}
