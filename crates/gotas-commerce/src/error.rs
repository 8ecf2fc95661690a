#[derive(Debug, thiserror::Error)]
pub enum CommerceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Payment not found: {0}")]
    NotFound(String),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type CommerceResult<T> = Result<T, CommerceError>;
