//! Tool handler seam
//!
//! A handler performs the actual work behind a catalog entry. The dispatcher
//! validates parameters and resolves configuration before calling it, so
//! handlers can assume required parameters are present with the declared
//! types and that the credential is set.

use std::fmt;

use async_trait::async_trait;
use gotas_config::ToolConfig;
use serde_json::{Map, Value};

type BoxedSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure reported by a tool handler.
///
/// `message` is safe to show to the caller; `source`, when present, is only
/// logged.
#[derive(Debug)]
pub struct HandlerError {
    message: String,
    source: Option<BoxedSource>,
}

impl HandlerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), source: None }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self { message: message.into(), source: Some(Box::new(source)) }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for HandlerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|s| s.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Executes one tool
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn invoke(&self, params: &Map<String, Value>, config: &ToolConfig)
        -> Result<Value, HandlerError>;
}
