use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse, Response};
use axum::Json;
use conclave_core::types::ConversationId;
use conclave_orchestrator::ChatTurnInput;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::app::AppState;
use crate::auth::resolve_external_user_id;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub personality_name: Option<String>,
    #[serde(default)]
    pub system_prompt: Option<String>,
}

/// Cancels the orchestrator's in-flight stream when the response body is
/// dropped, i.e. on client disconnect (spec.md §5: "client disconnect
/// propagates through the streaming pipeline and cancels the upstream
/// provider call").
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

/// POST /chat — streams `ChatEvent`s as a line-delimited JSON body
/// (spec.md §6: "a line-delimited stream of JSON events, each on its own
/// line terminated by newline"), not `text/event-stream` SSE framing.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    let user_external_id = resolve_external_user_id(&state, &headers)?;

    if req.message.trim().is_empty() {
        return Err(conclave_core::ConclaveError::InvalidRequest { reason: "message cannot be empty".to_string() }.into());
    }

    let conversation_id = req.conversation_id.as_deref().map(ConversationId::from);

    let input = ChatTurnInput {
        user_external_id,
        conversation_id,
        message: req.message,
        persona_name: req.personality_name,
        custom_system_prompt: req.system_prompt,
    };

    let (tx, mut rx) = mpsc::channel(64);
    let cancel = CancellationToken::new();
    let cancel_for_task = cancel.clone();
    let orchestrator = Arc::clone(&state.orchestrator);

    tokio::spawn(async move {
        if let Err(e) = orchestrator.handle_chat(input, cancel_for_task, tx).await {
            warn!(error = %e, "chat turn failed");
        }
    });

    let body_stream = async_stream::stream! {
        let _guard = CancelOnDrop(cancel);
        while let Some(event) = rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(mut line) => {
                    line.push('\n');
                    yield Ok::<Bytes, std::io::Error>(Bytes::from(line));
                }
                Err(e) => {
                    warn!(error = %e, "failed to serialize chat event");
                }
            }
        }
    };

    Ok((
        AppendHeaders([(axum::http::header::CONTENT_TYPE, "application/x-ndjson")]),
        Body::from_stream(body_stream),
    )
        .into_response())
}
