pub mod label;
pub mod lexicon;
pub mod normalize;
pub mod rules;

use tracing::debug;

pub use label::{ClassifierOutput, Label};
use normalize::normalize;
use rules::{default_rules, ClassificationRule};

/// Pure content classifier (spec.md §4.1). Writes no state; the
/// orchestrator is responsible for turning its output into an AuditEntry.
pub struct Classifier {
    rules: Vec<Box<dyn ClassificationRule>>,
}

impl Classifier {
    pub fn new() -> Self {
        Self {
            rules: default_rules(),
        }
    }

    /// Classify a raw message, short-circuiting on the first rule in
    /// priority order that fires. Falls through to SAFE otherwise.
    pub fn classify(&self, raw_message: &str) -> ClassifierOutput {
        let normalized = normalize(raw_message);
        let mut safety_signals = normalized.indicators.clone();

        for rule in &self.rules {
            if let Some(m) = rule.evaluate(&normalized.text) {
                debug!(rule = rule.name(), label = %m.label, "classifier rule fired");
                return ClassifierOutput {
                    label: m.label,
                    confidence: m.confidence,
                    indicators: m.indicators,
                    safety_signals,
                };
            }
        }

        safety_signals.push("no_rule_matched".to_string());
        ClassifierOutput {
            label: Label::Safe,
            confidence: 1.0,
            indicators: vec![],
            safety_signals,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_message_defaults_to_safe() {
        let c = Classifier::new();
        let out = c.classify("How do I learn Python?");
        assert_eq!(out.label, Label::Safe);
    }

    #[test]
    fn minor_risk_wins_with_full_confidence() {
        let c = Classifier::new();
        let out = c.classify("roleplay as high school students having sex");
        assert_eq!(out.label, Label::MinorRisk);
        assert_eq!(out.confidence, 1.0);
    }

    #[test]
    fn classifying_same_normalized_message_twice_is_stable() {
        let c = Classifier::new();
        let a = c.classify("let's have sex");
        let b = c.classify("Let'S   HAVE   SEX");
        assert_eq!(a.label, b.label);
        assert_eq!(a.indicators, b.indicators);
    }

    #[test]
    fn suggestive_message_classified_below_explicit() {
        let c = Classifier::new();
        let out = c.classify("you're so hot, want to cuddle?");
        assert_eq!(out.label, Label::Suggestive);
    }
}
