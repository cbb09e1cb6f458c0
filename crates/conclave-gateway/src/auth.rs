use axum::http::HeaderMap;
use conclave_core::config::AuthMode;
use conclave_core::ConclaveError;

use crate::app::AppState;

/// Returns true if the request clears the configured auth gate. Mirrors
/// the grounding codebase's `check_auth`/`extract_bearer` pair, extended
/// with a `Header` mode (presence of `X-User-Id` is itself the gate,
/// trusting an upstream proxy to have authenticated the caller).
fn check_auth(state: &AppState, headers: &HeaderMap) -> bool {
    match state.config.gateway.auth_mode {
        AuthMode::None => true,
        AuthMode::Token => {
            let expected = match state.config.gateway.bearer_token.as_deref() {
                Some(t) => t,
                None => return false,
            };
            extract_bearer(headers).map(|t| t == expected).unwrap_or(false)
        }
        AuthMode::Header => extract_user_id_header(headers).is_some(),
    }
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

fn extract_user_id_header(headers: &HeaderMap) -> Option<&str> {
    headers.get("x-user-id").and_then(|v| v.to_str().ok())
}

/// Authenticate the request and resolve the caller's external user id.
///
/// Precedence (spec.md §9 / SPEC_FULL.md §2.1): a bearer token always wins
/// when present — its literal value becomes the external id, since this
/// gateway has no JWT subject claim to decode. `X-User-Id` is consulted
/// only when `gateway.allow_user_id_header` is set, or there is no bearer
/// token to fall back on (auth modes `None`/`Header`).
pub fn resolve_external_user_id(state: &AppState, headers: &HeaderMap) -> Result<String, ConclaveError> {
    if !check_auth(state, headers) {
        return Err(ConclaveError::AuthFailed);
    }

    if let Some(bearer) = extract_bearer(headers) {
        return Ok(bearer.to_string());
    }

    if state.config.gateway.allow_user_id_header || state.config.gateway.auth_mode == AuthMode::Header {
        if let Some(uid) = extract_user_id_header(headers) {
            return Ok(uid.to_string());
        }
    }

    Err(ConclaveError::AuthFailed)
}
