use chrono::Utc;
use conclave_classifier::Label;
use conclave_core::config::RouterConfig;
use conclave_core::types::Route;

use crate::types::{RouteAction, RouteDecision, SessionState};

/// Apply the session router's state machine (spec.md §4.2), mutating
/// `state` in place and returning the decision the orchestrator must act
/// on. Pure given `(state, label, message_index, cfg)` — no I/O.
pub fn transition(
    state: &mut SessionState,
    label: Label,
    message_index: u64,
    cfg: &RouterConfig,
) -> RouteDecision {
    let decision = match label {
        Label::MinorRisk => {
            state.current_route = Route::HardRefused;
            RouteDecision {
                next_route: Route::HardRefused,
                action: RouteAction::RefuseHard,
            }
        }
        Label::Nonconsensual => {
            state.current_route = Route::Refused;
            RouteDecision {
                next_route: Route::Refused,
                action: RouteAction::RefuseSoft,
            }
        }
        Label::ExplicitConsensualAdult | Label::ExplicitFetish => {
            explicit_transition(state, label, message_index, cfg)
        }
        Label::Safe | Label::Suggestive => safe_or_suggestive_transition(state, label, message_index),
    };

    state.last_updated = Utc::now();
    decision
}

fn explicit_transition(
    state: &mut SessionState,
    label: Label,
    message_index: u64,
    cfg: &RouterConfig,
) -> RouteDecision {
    if state.attempts_exhausted(cfg.age_verification_attempt_cap) {
        state.current_route = Route::Refused;
        return RouteDecision {
            next_route: Route::Refused,
            action: RouteAction::RefuseSoft,
        };
    }

    if !state.age_verified {
        state.current_route = Route::GatePending;
        return RouteDecision {
            next_route: Route::GatePending,
            action: RouteAction::RequestAgeVerification,
        };
    }

    let route = if label == Label::ExplicitFetish {
        Route::Fetish
    } else {
        Route::Explicit
    };
    state.current_route = route;
    state.route_locked_until_message_index = message_index + cfg.lock_in_window;

    RouteDecision {
        next_route: route,
        action: RouteAction::Proceed,
    }
}

fn safe_or_suggestive_transition(
    state: &mut SessionState,
    label: Label,
    message_index: u64,
) -> RouteDecision {
    // While locked in an explicit-family route, SAFE/SUGGESTIVE inputs do
    // not downgrade the route — prevents a tone break mid-scene.
    if state.current_route.is_explicit_family() && state.is_locked_at(message_index) {
        return RouteDecision {
            next_route: state.current_route,
            action: RouteAction::Proceed,
        };
    }

    let route = if label == Label::Safe {
        Route::Normal
    } else {
        Route::Romance
    };
    state.current_route = route;

    RouteDecision {
        next_route: route,
        action: RouteAction::Proceed,
    }
}

/// Record a failed age-verification gate. Returns true if this failure
/// pushed the conversation past the attempt cap.
pub fn record_failed_age_verification(state: &mut SessionState, cfg: &RouterConfig) -> bool {
    state.age_verification_attempts += 1;
    state.last_updated = Utc::now();
    state.attempts_exhausted(cfg.age_verification_attempt_cap)
}

/// Apply a successful age-verification confirmation.
pub fn confirm_age_verified(state: &mut SessionState) {
    state.age_verified = true;
    state.last_updated = Utc::now();
}

#[cfg(test)]
mod tests {
    use super::*;
    use conclave_core::types::ConversationId;

    fn cfg() -> RouterConfig {
        RouterConfig::default()
    }

    #[test]
    fn safe_message_routes_to_normal() {
        let mut state = SessionState::new(ConversationId::new());
        let d = transition(&mut state, Label::Safe, 0, &cfg());
        assert_eq!(d.next_route, Route::Normal);
        assert_eq!(d.action, RouteAction::Proceed);
    }

    #[test]
    fn explicit_without_age_verification_requests_gate() {
        let mut state = SessionState::new(ConversationId::new());
        let d = transition(&mut state, Label::ExplicitConsensualAdult, 0, &cfg());
        assert_eq!(d.next_route, Route::GatePending);
        assert_eq!(d.action, RouteAction::RequestAgeVerification);
    }

    #[test]
    fn explicit_after_verification_locks_route() {
        let mut state = SessionState::new(ConversationId::new());
        confirm_age_verified(&mut state);
        let d = transition(&mut state, Label::ExplicitConsensualAdult, 10, &cfg());
        assert_eq!(d.next_route, Route::Explicit);
        assert_eq!(state.route_locked_until_message_index, 15);
    }

    #[test]
    fn lock_in_prevents_downgrade_from_safe_message() {
        let mut state = SessionState::new(ConversationId::new());
        confirm_age_verified(&mut state);
        transition(&mut state, Label::ExplicitConsensualAdult, 10, &cfg());
        let d = transition(&mut state, Label::Safe, 11, &cfg());
        assert_eq!(d.next_route, Route::Explicit);
    }

    #[test]
    fn lock_in_expires_after_window() {
        let mut state = SessionState::new(ConversationId::new());
        confirm_age_verified(&mut state);
        transition(&mut state, Label::ExplicitConsensualAdult, 10, &cfg());
        let d = transition(&mut state, Label::Safe, 15, &cfg());
        assert_eq!(d.next_route, Route::Normal);
    }

    #[test]
    fn hard_refusal_always_overrides_lock() {
        let mut state = SessionState::new(ConversationId::new());
        confirm_age_verified(&mut state);
        transition(&mut state, Label::ExplicitConsensualAdult, 10, &cfg());
        let d = transition(&mut state, Label::MinorRisk, 11, &cfg());
        assert_eq!(d.next_route, Route::HardRefused);
        assert_eq!(d.action, RouteAction::RefuseHard);
    }

    #[test]
    fn exhausted_attempts_downgrade_explicit_to_refused() {
        let mut state = SessionState::new(ConversationId::new());
        let c = cfg();
        for _ in 0..c.age_verification_attempt_cap {
            record_failed_age_verification(&mut state, &c);
        }
        let d = transition(&mut state, Label::ExplicitConsensualAdult, 0, &c);
        assert_eq!(d.next_route, Route::Refused);
        assert_eq!(d.action, RouteAction::RefuseSoft);
    }
}
