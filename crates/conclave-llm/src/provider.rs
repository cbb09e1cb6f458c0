use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ProviderError;
use crate::types::{ChatMessage, ChatParams, ChatResponse, StreamEvent};

/// Common interface implemented by every provider slot the dispatcher can
/// hold. Both the primary and secondary providers expose this single
/// capability set — spec.md §4.7 deliberately has no provider-specific
/// surface (tools, vision, etc).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<ChatResponse, ProviderError>;

    /// Stream a response through `tx`. Default falls back to `chat` and
    /// synthesizes a single token followed by `Done`.
    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &ChatParams,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let resp = self.chat(messages, params).await?;
        let _ = tx.send(StreamEvent::Token { text: resp.content }).await;
        let _ = tx
            .send(StreamEvent::Done {
                tokens_in: resp.tokens_in,
                tokens_out: resp.tokens_out,
                stop_reason: resp.stop_reason,
            })
            .await;
        Ok(())
    }

    /// Release any held resources (connection pools, sessions). A no-op
    /// for stateless HTTP providers.
    async fn close(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}
