use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use conclave_core::ConclaveError;
use serde_json::json;

/// Wraps `ConclaveError` so it can be returned directly from axum handlers,
/// mapping to the status codes and `code` strings spec.md §7 requires.
pub struct ApiError(pub ConclaveError);

impl From<ConclaveError> for ApiError {
    fn from(e: ConclaveError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({
            "error": self.0.code(),
            "message": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}
