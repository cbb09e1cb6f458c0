use thiserror::Error;

/// Top-level error type surfaced across orchestration and gateway layers.
#[derive(Debug, Error)]
pub enum ConclaveError {
    #[error("authentication failed")]
    AuthFailed,

    #[error("forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("rate limited")]
    RateLimited,

    #[error("content refused")]
    ContentRefused,

    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("cache error: {0}")]
    Cache(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ConclaveError {
    /// Stable machine-readable code, surfaced to clients per spec.md §7.
    pub fn code(&self) -> &'static str {
        match self {
            ConclaveError::AuthFailed => "auth_failed",
            ConclaveError::Forbidden { .. } => "forbidden",
            ConclaveError::InvalidRequest { .. } => "invalid_request",
            ConclaveError::RateLimited => "rate_limited",
            ConclaveError::ContentRefused => "content_refused",
            ConclaveError::ModelUnavailable { .. } => "model_unavailable",
            ConclaveError::Config(_) => "internal",
            ConclaveError::Store(_) => "internal",
            ConclaveError::Cache(_) => "internal",
            ConclaveError::Serialization(_) => "internal",
            ConclaveError::Io(_) => "internal",
            ConclaveError::Internal(_) => "internal",
        }
    }

    /// HTTP status code a gateway should map this error to.
    pub fn status_code(&self) -> u16 {
        match self {
            ConclaveError::AuthFailed => 401,
            ConclaveError::Forbidden { .. } => 403,
            ConclaveError::InvalidRequest { .. } => 400,
            ConclaveError::RateLimited => 429,
            ConclaveError::ContentRefused => 200,
            ConclaveError::ModelUnavailable { .. } => 500,
            _ => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConclaveError>;
