/// Classification of provider failures (spec.md §4.7). The dispatcher
/// only needs to know which of these are fallback-eligible; callers get
/// the full detail for logging.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    TransportError(String),

    #[error("http status {status}: {message}")]
    HttpStatusError { status: u16, message: String },

    #[error("protocol error: {0}")]
    ProtocolError(String),

    #[error("auth error (status {status})")]
    AuthError { status: u16 },
}

impl ProviderError {
    /// Transport, HTTP status, and protocol failures are retried against
    /// the fallback provider; auth failures are a configuration problem
    /// and are never fallback-eligible.
    pub fn is_fallback_eligible(&self) -> bool {
        !matches!(self, ProviderError::AuthError { .. })
    }
}
