use conclave_core::types::Route;

use crate::error::ProviderError;
use crate::provider::LlmProvider;

/// Which configured provider slot a call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderSlot {
    Primary,
    Secondary,
}

/// Holds the two configured providers and the routing rule that decides
/// which one serves a given request (spec.md §4.7/§4.8). The dispatcher
/// only classifies failures and hands out provider handles; the actual
/// two-phase call-then-fallback sequencing belongs to the orchestrator,
/// which owns the safety-annotated prompt swap on fallback.
pub struct Dispatcher {
    primary: Box<dyn LlmProvider>,
    secondary: Box<dyn LlmProvider>,
}

impl Dispatcher {
    pub fn new(primary: Box<dyn LlmProvider>, secondary: Box<dyn LlmProvider>) -> Self {
        Self { primary, secondary }
    }

    /// EXPLICIT and FETISH routes start on the secondary (uncensored)
    /// provider; every other route starts on the primary.
    pub fn initial_slot(route: Route) -> ProviderSlot {
        if route.is_explicit_family() {
            ProviderSlot::Secondary
        } else {
            ProviderSlot::Primary
        }
    }

    /// The fallback path only exists for explicit-family routes, and it
    /// always lands on the primary provider.
    pub fn fallback_slot(initial: ProviderSlot) -> Option<ProviderSlot> {
        match initial {
            ProviderSlot::Secondary => Some(ProviderSlot::Primary),
            ProviderSlot::Primary => None,
        }
    }

    pub fn provider(&self, slot: ProviderSlot) -> &dyn LlmProvider {
        match slot {
            ProviderSlot::Primary => self.primary.as_ref(),
            ProviderSlot::Secondary => self.secondary.as_ref(),
        }
    }

    pub fn is_fallback_eligible(err: &ProviderError) -> bool {
        err.is_fallback_eligible()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatMessage, ChatParams, ChatResponse};
    use async_trait::async_trait;

    struct Stub(&'static str);

    #[async_trait]
    impl LlmProvider for Stub {
        fn name(&self) -> &str {
            self.0
        }
        async fn chat(&self, _messages: &[ChatMessage], _params: &ChatParams) -> Result<ChatResponse, ProviderError> {
            Ok(ChatResponse { content: self.0.to_string(), tokens_in: 1, tokens_out: 1, stop_reason: "stop".to_string() })
        }
    }

    #[test]
    fn explicit_family_routes_start_on_secondary() {
        assert_eq!(Dispatcher::initial_slot(Route::Explicit), ProviderSlot::Secondary);
        assert_eq!(Dispatcher::initial_slot(Route::Fetish), ProviderSlot::Secondary);
        assert_eq!(Dispatcher::initial_slot(Route::Normal), ProviderSlot::Primary);
        assert_eq!(Dispatcher::initial_slot(Route::Romance), ProviderSlot::Primary);
    }

    #[test]
    fn fallback_only_exists_from_secondary() {
        assert_eq!(Dispatcher::fallback_slot(ProviderSlot::Secondary), Some(ProviderSlot::Primary));
        assert_eq!(Dispatcher::fallback_slot(ProviderSlot::Primary), None);
    }

    #[test]
    fn dispatcher_resolves_named_provider_by_slot() {
        let d = Dispatcher::new(Box::new(Stub("primary")), Box::new(Stub("secondary")));
        assert_eq!(d.provider(ProviderSlot::Primary).name(), "primary");
        assert_eq!(d.provider(ProviderSlot::Secondary).name(), "secondary");
    }

    #[test]
    fn auth_errors_are_not_fallback_eligible() {
        assert!(!Dispatcher::is_fallback_eligible(&ProviderError::AuthError { status: 401 }));
        assert!(Dispatcher::is_fallback_eligible(&ProviderError::TransportError("x".to_string())));
    }
}
