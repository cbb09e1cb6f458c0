use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::provider::LlmProvider;
use crate::types::{ChatMessage, ChatParams, ChatResponse, StreamEvent};

/// A generic HTTP chat-completion provider, configured once per provider
/// slot (spec.md §4.7: two concrete variants selected by configuration,
/// not two separate implementations). Speaks a small JSON protocol:
/// `POST {base_url}/v1/chat` with `{model, system, messages, max_tokens,
/// temperature, stop, stream}`; non-streaming replies are a single JSON
/// object, streaming replies are newline-delimited JSON chunks.
pub struct HttpLlmProvider {
    name: String,
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpLlmProvider {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        connect_timeout_ms: u64,
    ) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_millis(connect_timeout_ms))
            .build()
            .unwrap_or_default();
        Self {
            name: name.into(),
            client,
            base_url: base_url.into(),
            api_key,
        }
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key.as_deref().unwrap_or("not-needed"))
    }

    fn body(&self, messages: &[ChatMessage], params: &ChatParams, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": params.model,
            "system": params.system_prompt,
            "messages": messages.iter().map(|m| serde_json::json!({
                "role": m.role,
                "content": m.content,
            })).collect::<Vec<_>>(),
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
            "stop": params.stop_sequences,
            "stream": stream,
        })
    }

    fn classify_transport(err: &reqwest::Error) -> ProviderError {
        ProviderError::TransportError(err.to_string())
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn chat(&self, messages: &[ChatMessage], params: &ChatParams) -> Result<ChatResponse, ProviderError> {
        let url = format!("{}/v1/chat", self.base_url);
        debug!(provider = %self.name, model = %params.model, "sending chat request");

        let resp = self
            .client
            .post(&url)
            .header("authorization", self.bearer())
            .timeout(std::time::Duration::from_millis(params.timeout_ms))
            .json(&self.body(messages, params, false))
            .send()
            .await
            .map_err(|e| Self::classify_transport(&e))?;

        let status = resp.status().as_u16();
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError { status });
        }
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %text, "provider returned error status");
            return Err(ProviderError::HttpStatusError { status, message: text });
        }

        let parsed: ChatCompletionBody = resp
            .json()
            .await
            .map_err(|e| ProviderError::ProtocolError(e.to_string()))?;

        Ok(ChatResponse {
            content: parsed.content,
            tokens_in: parsed.tokens_in.unwrap_or(0),
            tokens_out: parsed.tokens_out.unwrap_or(0),
            stop_reason: parsed.stop_reason.unwrap_or_else(|| "stop".to_string()),
        })
    }

    async fn stream_chat(
        &self,
        messages: &[ChatMessage],
        params: &ChatParams,
        tx: mpsc::Sender<StreamEvent>,
    ) -> Result<(), ProviderError> {
        let url = format!("{}/v1/chat", self.base_url);
        debug!(provider = %self.name, model = %params.model, "sending streaming chat request");

        let resp = self
            .client
            .post(&url)
            .header("authorization", self.bearer())
            .timeout(std::time::Duration::from_millis(params.timeout_ms))
            .json(&self.body(messages, params, true))
            .send()
            .await
            .map_err(|e| Self::classify_transport(&e))?;

        let status = resp.status().as_u16();
        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError { status });
        }
        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(provider = %self.name, status, body = %text, "provider returned error status");
            return Err(ProviderError::HttpStatusError { status, message: text });
        }

        process_ndjson_stream(&self.name, resp, tx).await;
        Ok(())
    }
}

/// Parse the provider's newline-delimited JSON streaming format. Each line
/// is either a `{"delta": "..."}` text chunk or a `{"done": true, ...}`
/// terminal chunk carrying token counts and stop reason.
async fn process_ndjson_stream(provider_name: &str, resp: reqwest::Response, tx: mpsc::Sender<StreamEvent>) {
    use futures_util::StreamExt;

    let mut tokens_in: u32 = 0;
    let mut tokens_out: u32 = 0;
    let mut stop_reason = String::new();
    let mut line_buf = String::new();

    let mut byte_stream = resp.bytes_stream();

    while let Some(chunk) = byte_stream.next().await {
        let chunk = match chunk {
            Ok(c) => c,
            Err(e) => {
                let _ = tx.send(StreamEvent::Error { message: e.to_string() }).await;
                return;
            }
        };

        let text = match std::str::from_utf8(&chunk) {
            Ok(t) => t,
            Err(_) => continue,
        };

        line_buf.push_str(text);
        let lines: Vec<&str> = line_buf.split('\n').collect();
        let (complete, remainder) = lines.split_at(lines.len() - 1);
        let remainder = remainder.first().unwrap_or(&"").to_string();

        for line in complete {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match serde_json::from_str::<StreamChunk>(line) {
                Ok(chunk_data) => {
                    if chunk_data.done {
                        tokens_in = chunk_data.tokens_in.unwrap_or(0);
                        tokens_out = chunk_data.tokens_out.unwrap_or(0);
                        stop_reason = chunk_data.stop_reason.unwrap_or_else(|| "stop".to_string());
                    } else if let Some(delta) = chunk_data.delta {
                        if !delta.is_empty() && tx.send(StreamEvent::Token { text: delta }).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    warn!(provider = provider_name, line, err = %e, "failed to parse stream chunk");
                }
            }
        }

        line_buf = remainder;
    }

    let _ = tx
        .send(StreamEvent::Done { tokens_in, tokens_out, stop_reason })
        .await;
}

#[derive(Deserialize)]
struct ChatCompletionBody {
    content: String,
    tokens_in: Option<u32>,
    tokens_out: Option<u32>,
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    delta: Option<String>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    tokens_in: Option<u32>,
    #[serde(default)]
    tokens_out: Option<u32>,
    #[serde(default)]
    stop_reason: Option<String>,
}
