use std::sync::Arc;
use std::time::Duration;

use conclave_cache::CachePort;
use conclave_classifier::{Classifier, ClassifierOutput};
use conclave_core::audit::{AuditAction, AuditEntry, AuditSink};
use conclave_core::config::ConclaveConfig;
use conclave_core::embedding::EmbeddingPort;
use conclave_core::types::{PersonaId, Role as CoreRole, Route};
use conclave_core::{ConclaveError, Result};
use conclave_llm::{ChatMessage, ChatParams, Dispatcher, HttpLlmProvider, ProviderSlot, Role as LlmRole, StreamEvent as LlmStreamEvent};
use conclave_memory::long_term::{retrieve, HeuristicExtractor, MemoryExtractor};
use conclave_memory::short_term::window;
use conclave_router::{confirm_age_verified, record_failed_age_verification, route, RouteAction, SessionState};
use conclave_store::{Conversation, Message, Persona, Preferences, StorePort, User};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::extraction::{ExtractionPool, ExtractionTask};
use crate::lease::LeaseRegistry;
use crate::refusal::{AGE_VERIFICATION_QUESTION, HARD_REFUSAL_TEXT, SOFT_REFUSAL_TEXT};
use crate::types::{ChatEvent, ChatTurnInput};

const PERSONA_CACHE_TTL: Duration = Duration::from_secs(300);

/// The core request lifecycle (spec.md §4.8). Holds every collaborator the
/// turn needs; constructed once at startup and shared (behind `Arc`) across
/// concurrent requests.
pub struct Orchestrator {
    store: Arc<dyn StorePort>,
    cache: Arc<dyn CachePort>,
    embedder: Arc<dyn EmbeddingPort>,
    classifier: Classifier,
    dispatcher: Dispatcher,
    primary_model: String,
    secondary_model: String,
    extraction_pool: ExtractionPool,
    leases: Arc<LeaseRegistry>,
    audit_sink: Arc<dyn AuditSink>,
    config: Arc<ConclaveConfig>,
}

impl Orchestrator {
    pub fn new(
        config: Arc<ConclaveConfig>,
        store: Arc<dyn StorePort>,
        cache: Arc<dyn CachePort>,
        embedder: Arc<dyn EmbeddingPort>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        let primary = HttpLlmProvider::new(
            config.providers.primary.name.clone(),
            config.providers.primary.base_url.clone(),
            config.providers.primary.api_key.clone(),
            config.providers.primary.connect_timeout_ms,
        );
        let secondary = HttpLlmProvider::new(
            config.providers.secondary.name.clone(),
            config.providers.secondary.base_url.clone(),
            config.providers.secondary.api_key.clone(),
            config.providers.secondary.connect_timeout_ms,
        );
        let dispatcher = Dispatcher::new(Box::new(primary), Box::new(secondary));
        let leases = Arc::new(LeaseRegistry::new());
        let extraction_pool = ExtractionPool::spawn(
            config.workers.extraction_pool_size,
            config.workers.queue_watermark,
            Arc::clone(&store),
            Arc::clone(&embedder),
            Arc::new(HeuristicExtractor) as Arc<dyn MemoryExtractor>,
            Arc::clone(&leases),
            config.memory.dedup_similarity_threshold,
        );

        Self {
            store,
            cache,
            embedder,
            classifier: Classifier::new(),
            dispatcher,
            primary_model: config.providers.primary.model.clone(),
            secondary_model: config.providers.secondary.model.clone(),
            extraction_pool,
            leases,
            audit_sink,
            config,
        }
    }

    /// Run one full chat turn, forwarding wire events to `tx` as they occur.
    /// Returns once the stream has terminated (`Done` or `Error` emitted) or
    /// the caller cancels.
    #[instrument(skip(self, tx, cancel), fields(user = %input.user_external_id))]
    pub async fn handle_chat(&self, input: ChatTurnInput, cancel: CancellationToken, tx: mpsc::Sender<ChatEvent>) -> Result<()> {
        let user = self.store.get_or_create_user(&input.user_external_id).map_err(|e| ConclaveError::Store(e.to_string()))?;

        let persona = match &input.persona_name {
            Some(name) => Some(self.resolve_persona(name)?),
            None => None,
        };

        let conversation = self.resolve_conversation(&input, &user.id, persona.as_ref())?;

        let lease = self.leases.get(&conversation.id);
        let _guard = lease.lock().await;

        let history = self
            .store
            .list_recent_messages(&conversation.id, self.config.memory.short_term_capacity * 4)
            .map_err(|e| ConclaveError::Store(e.to_string()))?;
        // Uncapped count, not `history.len()` — `list_recent_messages` is
        // LIMITed and would freeze the index once a conversation outgrows
        // the window, permanently locking the router's lock-in state.
        let message_index = self
            .store
            .count_messages(&conversation.id)
            .map_err(|e| ConclaveError::Store(e.to_string()))?;

        let user_message = Message::new(conversation.id.clone(), CoreRole::User, input.message.clone());
        self.store.append_message(&user_message).map_err(|e| ConclaveError::Store(e.to_string()))?;

        let classification = self.classifier.classify(&input.message);

        let mut session_state = self
            .store
            .get_session_state(&conversation.id)
            .map_err(|e| ConclaveError::Store(e.to_string()))?
            .unwrap_or_else(|| SessionState::new(conversation.id.clone()));

        let decision = route(&mut session_state, classification.label, message_index, &self.config.router);
        self.store.save_session_state(&session_state).map_err(|e| ConclaveError::Store(e.to_string()))?;

        self.record_audit(&user.id, &conversation.id, &input.message, &classification, decision.next_route, decision.action);

        match decision.action {
            RouteAction::RefuseHard => {
                drop(_guard);
                self.refuse(&conversation.id, HARD_REFUSAL_TEXT, &tx).await;
                return Ok(());
            }
            RouteAction::RefuseSoft => {
                drop(_guard);
                self.refuse(&conversation.id, SOFT_REFUSAL_TEXT, &tx).await;
                return Ok(());
            }
            RouteAction::RequestAgeVerification => {
                let _ = tx.send(ChatEvent::Thinking { step: "age_verification_required".to_string(), data: None }).await;
                let assistant = Message::new(conversation.id.clone(), CoreRole::Assistant, AGE_VERIFICATION_QUESTION);
                self.store.append_message(&assistant).map_err(|e| ConclaveError::Store(e.to_string()))?;
                drop(_guard);
                let _ = tx
                    .send(ChatEvent::Done { conversation_id: conversation.id.to_string(), message_id: assistant.id.to_string() })
                    .await;
                return Ok(());
            }
            RouteAction::Proceed => {}
        }

        let mut buffer = window(history, self.config.memory.short_term_capacity);
        buffer.recent.push(user_message.clone());
        let summarize_needed = buffer.summarize_needed;

        self.proceed(
            &input,
            &user,
            &conversation,
            persona.as_ref(),
            decision.next_route,
            buffer.recent,
            summarize_needed,
            &cancel,
            &tx,
        )
        .await?;

        drop(_guard);
        Ok(())
    }

    /// Handle a `POST /content/age-verify` confirmation.
    pub async fn confirm_age_verification(&self, conversation_id: &conclave_core::types::ConversationId, confirmed: bool) -> Result<bool> {
        let lease = self.leases.get(conversation_id);
        let _guard = lease.lock().await;
        let mut state = self
            .store
            .get_session_state(conversation_id)
            .map_err(|e| ConclaveError::Store(e.to_string()))?
            .unwrap_or_else(|| SessionState::new(conversation_id.clone()));

        if confirmed {
            confirm_age_verified(&mut state);
        } else {
            record_failed_age_verification(&mut state, &self.config.router);
        }
        self.store.save_session_state(&state).map_err(|e| ConclaveError::Store(e.to_string()))?;
        Ok(state.age_verified)
    }

    fn resolve_persona(&self, name: &str) -> Result<Persona> {
        let cache_key = format!("persona:{name}");
        if let Some(bytes) = self.cache.get(&cache_key) {
            if let Ok(persona) = serde_json::from_slice::<Persona>(&bytes) {
                return Ok(persona);
            }
        }
        let persona = self
            .store
            .get_persona_by_name(name)
            .map_err(|e| ConclaveError::Store(e.to_string()))?
            .ok_or_else(|| ConclaveError::InvalidRequest { reason: format!("unknown persona: {name}") })?;
        if let Ok(bytes) = serde_json::to_vec(&persona) {
            self.cache.put(&cache_key, bytes, PERSONA_CACHE_TTL);
        }
        Ok(persona)
    }

    fn resolve_persona_by_id(&self, id: &PersonaId) -> Result<Option<Persona>> {
        self.store.get_persona_by_id(id).map_err(|e| ConclaveError::Store(e.to_string()))
    }

    fn resolve_conversation(&self, input: &ChatTurnInput, user_id: &conclave_core::types::UserId, persona: Option<&Persona>) -> Result<Conversation> {
        let conversation = match &input.conversation_id {
            Some(id) => self
                .store
                .get_conversation(id)
                .map_err(|e| ConclaveError::Store(e.to_string()))?
                .ok_or_else(|| ConclaveError::InvalidRequest { reason: "unknown conversation_id".to_string() })?,
            None => self.store.create_conversation(user_id).map_err(|e| ConclaveError::Store(e.to_string()))?,
        };

        if conversation.persona_id.is_none() {
            if let Some(p) = persona {
                self.store
                    .stamp_conversation_persona(&conversation.id, &p.id)
                    .map_err(|e| ConclaveError::Store(e.to_string()))?;
            }
        }

        Ok(conversation)
    }

    #[allow(clippy::too_many_arguments)]
    fn record_audit(
        &self,
        user_id: &conclave_core::types::UserId,
        conversation_id: &conclave_core::types::ConversationId,
        raw_message: &str,
        classification: &ClassifierOutput,
        route: Route,
        action: RouteAction,
    ) {
        let audit_action = match action {
            RouteAction::Proceed => AuditAction::Generate,
            RouteAction::RequestAgeVerification => AuditAction::AgeVerify,
            RouteAction::RefuseSoft | RouteAction::RefuseHard => AuditAction::Refuse,
        };
        let entry = AuditEntry {
            timestamp: chrono::Utc::now(),
            user_id: user_id.clone(),
            conversation_id: conversation_id.clone(),
            label: classification.label.to_string(),
            confidence: classification.confidence,
            indicators: classification.indicators.clone(),
            route,
            action: audit_action,
            message_digest: AuditEntry::digest(raw_message),
        };
        if let Err(e) = self.audit_sink.record(&entry) {
            warn!(error = %e, "failed to record audit entry");
        }
    }

    async fn refuse(&self, conversation_id: &conclave_core::types::ConversationId, text: &str, tx: &mpsc::Sender<ChatEvent>) {
        let assistant = Message::new(conversation_id.clone(), CoreRole::Assistant, text);
        if let Err(e) = self.store.append_message(&assistant) {
            warn!(error = %e, "failed to persist refusal turn");
        }
        let _ = tx
            .send(ChatEvent::Done { conversation_id: conversation_id.to_string(), message_id: assistant.id.to_string() })
            .await;
    }

    #[allow(clippy::too_many_arguments)]
    async fn proceed(
        &self,
        input: &ChatTurnInput,
        user: &User,
        conversation: &Conversation,
        persona: Option<&Persona>,
        next_route: Route,
        recent_messages: Vec<Message>,
        summarize_needed: bool,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> Result<()> {
        let persona = match persona {
            Some(p) => Some(p.clone()),
            None => match &conversation.persona_id {
                Some(id) => self.resolve_persona_by_id(id)?,
                None => None,
            },
        };

        let query_embedding = self.embedder.embed(&input.message).await?;
        let scored_memories = retrieve(
            self.store.as_ref(),
            &user.id,
            persona.as_ref().map(|p| &p.id),
            &query_embedding,
            self.config.memory.retrieval_top_k,
            self.config.router.similarity_weight,
            self.config.router.importance_weight,
            self.config.router.similarity_threshold,
        )
        .map_err(|e| ConclaveError::Store(e.to_string()))?;

        let preferences = self.store.get_preferences(&user.id).map_err(|e| ConclaveError::Store(e.to_string()))?;

        let _ = tx
            .send(ChatEvent::Thinking {
                step: "content_routed".to_string(),
                data: Some(serde_json::json!({ "route": next_route.to_string() })),
            })
            .await;

        let persona_base_text = input
            .custom_system_prompt
            .clone()
            .or_else(|| persona.as_ref().map(|p| p.base_system_text.clone()))
            .unwrap_or_else(|| "You are a helpful assistant.".to_string());

        let prompt_input = conclave_prompt::PromptInput {
            persona_base_text,
            retrieved_memories: scored_memories,
            conversation_summary: conversation.last_summary.clone(),
            user_preferences: preferences,
            detected_emotion: None,
            personality_overrides: persona.as_ref().map(|p| p.traits.clone()),
            goal_context: None,
        };
        let system_prompt = conclave_prompt::compose(&prompt_input);

        let llm_messages: Vec<ChatMessage> = recent_messages
            .iter()
            .map(|m| ChatMessage {
                role: match m.role {
                    CoreRole::User => LlmRole::User,
                    CoreRole::Assistant => LlmRole::Assistant,
                },
                content: m.content.clone(),
            })
            .collect();

        let initial_slot = Dispatcher::initial_slot(next_route);
        let model = match initial_slot {
            ProviderSlot::Primary => self.primary_model.clone(),
            ProviderSlot::Secondary => self.secondary_model.clone(),
        };
        let timeout_ms = if initial_slot == ProviderSlot::Primary {
            self.config.providers.primary.total_timeout_ms
        } else {
            self.config.providers.secondary.total_timeout_ms
        };
        let params = ChatParams { model, system_prompt: system_prompt.clone(), timeout_ms, ..Default::default() };

        let (content, tokens_used) = self.stream_with_fallback(initial_slot, &llm_messages, params, &system_prompt, cancel, tx).await;

        if content.is_empty() {
            return Ok(());
        }

        let assistant = Message::new(conversation.id.clone(), CoreRole::Assistant, content);
        self.store.append_message(&assistant).map_err(|e| ConclaveError::Store(e.to_string()))?;
        let _ = self.store.touch_user_last_active(&user.id);
        if let Err(e) = self.store.record_usage(&user.id, 2, tokens_used) {
            warn!(error = %e, "usage counter update failed");
        }

        if summarize_needed {
            // The buffer just evicted its oldest slice. A real deployment
            // wires an LLM-driven summarizer here to fold it into
            // `conversation.last_summary`; no such collaborator exists in
            // this workspace, so the due-ness is only logged.
            debug!(conversation_id = %conversation.id, "short-term buffer evicted messages, summary fold is due");
        }

        self.extraction_pool.enqueue(ExtractionTask {
            conversation_id: conversation.id.clone(),
            user_id: user.id.clone(),
            persona_id: persona.as_ref().map(|p| p.id.clone()),
            user_message: input.message.clone(),
            assistant_message: assistant.content.clone(),
        });

        let detected = conclave_memory::detect_preferences(&input.message);
        if detected != Preferences::default() {
            if let Err(e) = self.store.merge_preferences(&user.id, detected) {
                warn!(error = %e, "preference extraction merge failed");
            }
        }

        let _ = tx
            .send(ChatEvent::Done { conversation_id: conversation.id.to_string(), message_id: assistant.id.to_string() })
            .await;

        Ok(())
    }

    /// Stream from `initial_slot`, falling back to the paired slot on a
    /// fallback-eligible error for explicit-family routes (spec.md §4.7).
    /// Returns whatever content was produced; empty means the turn failed
    /// outright (an `Error` event has already been sent in that case).
    async fn stream_with_fallback(
        &self,
        initial_slot: ProviderSlot,
        messages: &[ChatMessage],
        params: ChatParams,
        base_system_prompt: &str,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> (String, u64) {
        let (content, tokens, result) = self.run_stream(initial_slot, messages, &params, cancel, tx).await;

        let err = match result {
            Ok(()) => return (content, tokens),
            Err(e) => e,
        };

        // Tokens from the initial provider already reached the client under
        // this provider's voice; swapping providers mid-stream would mix the
        // two in one turn, so there is nothing safe left to fall back to.
        if !content.is_empty() {
            return (content, tokens);
        }

        let Some(fallback_slot) = Dispatcher::fallback_slot(initial_slot) else {
            let _ = tx.send(ChatEvent::Error { kind: "model_unavailable".to_string(), message: err.to_string() }).await;
            return (String::new(), 0);
        };

        if !err.is_fallback_eligible() {
            let _ = tx.send(ChatEvent::Error { kind: "model_unavailable".to_string(), message: err.to_string() }).await;
            return (String::new(), 0);
        }

        let _ = tx
            .send(ChatEvent::Thinking { step: "model_fallback".to_string(), data: Some(serde_json::json!({ "reason": err.to_string() })) })
            .await;

        let safety_prompt = format!(
            "{base_system_prompt}\n\nSAFETY NOTE: the primary content provider is handling this turn after a fallback; keep the response within ordinary safe-completion bounds.",
        );
        let fallback_params = ChatParams { system_prompt: safety_prompt, ..params };
        let (fallback_content, fallback_tokens, fallback_result) =
            self.run_stream(fallback_slot, messages, &fallback_params, cancel, tx).await;

        if let Err(e) = fallback_result {
            if fallback_content.is_empty() {
                let _ = tx.send(ChatEvent::Error { kind: "model_unavailable".to_string(), message: e.to_string() }).await;
            }
        }

        (fallback_content, fallback_tokens)
    }

    /// Run a single provider call end-to-end, forwarding `Token` events to
    /// `tx` and returning whatever content was accumulated alongside the
    /// call's outcome. Content is returned even on error/cancellation so the
    /// caller can decide whether a partial turn is still usable.
    async fn run_stream(
        &self,
        slot: ProviderSlot,
        messages: &[ChatMessage],
        params: &ChatParams,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> (String, u64, std::result::Result<(), conclave_llm::ProviderError>) {
        let provider = self.dispatcher.provider(slot);
        let (provider_tx, mut provider_rx) = mpsc::channel::<LlmStreamEvent>(64);

        let call = provider.stream_chat(messages, params, provider_tx);
        tokio::pin!(call);

        let mut content = String::new();
        let mut tokens: u64 = 0;
        let mut call_result: Option<std::result::Result<(), conclave_llm::ProviderError>> = None;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return (content, tokens, Ok(()));
                }
                res = &mut call, if call_result.is_none() => {
                    call_result = Some(res);
                }
                event = provider_rx.recv() => {
                    match event {
                        Some(LlmStreamEvent::Token { text }) => {
                            content.push_str(&text);
                            let _ = tx.send(ChatEvent::Token { content: text }).await;
                        }
                        Some(LlmStreamEvent::Done { tokens_in, tokens_out, .. }) => {
                            tokens = tokens_in as u64 + tokens_out as u64;
                        }
                        Some(LlmStreamEvent::Error { message }) => {
                            return (content, tokens, Err(conclave_llm::ProviderError::ProtocolError(message)));
                        }
                        None => {
                            if let Some(result) = call_result.take() {
                                return (content, tokens, result);
                            }
                        }
                    }
                }
            }
        }
    }
}
