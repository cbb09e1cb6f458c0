use crate::label::Label;
use crate::lexicon::{
    contains_any, CLINICAL_CONTEXT_TERMS, EXPLICIT_ACT_TERMS, EXPLICIT_ANATOMICAL_TERMS,
    FETISH_TERMS, MINOR_AGE_TERMS, NONCONSENT_TERMS, SEXUAL_CONTEXT_TERMS, SUGGESTIVE_TERMS,
};

/// A single decisive-signal match: the label it would assign, the rule's
/// intrinsic confidence, and which lexical indicators fired.
pub struct RuleMatch {
    pub label: Label,
    pub confidence: f64,
    pub indicators: Vec<String>,
}

/// One stage of the short-circuiting classification pipeline. Stages run
/// in priority order (ascending `priority()`); the first stage to return
/// `Some` wins.
pub trait ClassificationRule: Send + Sync {
    fn priority(&self) -> u8;
    fn name(&self) -> &'static str;
    fn evaluate(&self, text: &str) -> Option<RuleMatch>;
}

pub struct MinorAgeRule;

impl ClassificationRule for MinorAgeRule {
    fn priority(&self) -> u8 {
        0
    }

    fn name(&self) -> &'static str {
        "minor_age"
    }

    fn evaluate(&self, text: &str) -> Option<RuleMatch> {
        let sexual = !contains_any(text, SEXUAL_CONTEXT_TERMS).is_empty();
        let age_hits = contains_any(text, MINOR_AGE_TERMS);
        if sexual && !age_hits.is_empty() {
            Some(RuleMatch {
                label: Label::MinorRisk,
                confidence: 1.0,
                indicators: age_hits,
            })
        } else {
            None
        }
    }
}

pub struct NonconsentRule;

impl ClassificationRule for NonconsentRule {
    fn priority(&self) -> u8 {
        1
    }

    fn name(&self) -> &'static str {
        "nonconsent"
    }

    fn evaluate(&self, text: &str) -> Option<RuleMatch> {
        let sexual = !contains_any(text, SEXUAL_CONTEXT_TERMS).is_empty();
        let hits = contains_any(text, NONCONSENT_TERMS);
        if sexual && !hits.is_empty() {
            Some(RuleMatch {
                label: Label::Nonconsensual,
                confidence: 1.0,
                indicators: hits,
            })
        } else {
            None
        }
    }
}

pub struct ExplicitPatternRule;

impl ClassificationRule for ExplicitPatternRule {
    fn priority(&self) -> u8 {
        2
    }

    fn name(&self) -> &'static str {
        "explicit_pattern"
    }

    fn evaluate(&self, text: &str) -> Option<RuleMatch> {
        let clinical = !contains_any(text, CLINICAL_CONTEXT_TERMS).is_empty();
        if clinical {
            return None;
        }

        let fetish_hits = contains_any(text, FETISH_TERMS);
        if !fetish_hits.is_empty() {
            let confidence = rule_confidence(fetish_hits.len());
            return Some(RuleMatch {
                label: Label::ExplicitFetish,
                confidence,
                indicators: fetish_hits,
            });
        }

        let mut hits = contains_any(text, EXPLICIT_ANATOMICAL_TERMS);
        hits.extend(contains_any(text, EXPLICIT_ACT_TERMS));
        if !hits.is_empty() {
            let confidence = rule_confidence(hits.len());
            return Some(RuleMatch {
                label: Label::ExplicitConsensualAdult,
                confidence,
                indicators: hits,
            });
        }

        None
    }
}

pub struct SuggestiveRule;

impl ClassificationRule for SuggestiveRule {
    fn priority(&self) -> u8 {
        3
    }

    fn name(&self) -> &'static str {
        "suggestive"
    }

    fn evaluate(&self, text: &str) -> Option<RuleMatch> {
        let hits = contains_any(text, SUGGESTIVE_TERMS);
        if hits.is_empty() {
            None
        } else {
            Some(RuleMatch {
                label: Label::Suggestive,
                confidence: rule_confidence(hits.len()),
                indicators: hits,
            })
        }
    }
}

/// Confidence grows with match count but saturates below 1.0 — only the
/// hard-refusal rules (age, consent) are entitled to full confidence.
fn rule_confidence(match_count: usize) -> f64 {
    let base = 0.6;
    let bonus = 0.1 * (match_count.saturating_sub(1) as f64);
    (base + bonus).min(0.95)
}

/// Default rule pipeline, ordered by priority.
pub fn default_rules() -> Vec<Box<dyn ClassificationRule>> {
    let mut rules: Vec<Box<dyn ClassificationRule>> = vec![
        Box::new(MinorAgeRule),
        Box::new(NonconsentRule),
        Box::new(ExplicitPatternRule),
        Box::new(SuggestiveRule),
    ];
    rules.sort_by_key(|r| r.priority());
    rules
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_age_rule_requires_sexual_context() {
        let rule = MinorAgeRule;
        assert!(rule.evaluate("my teen sister loves math").is_none());
        assert!(rule.evaluate("let's have sex, i'm a teen").is_some());
    }

    #[test]
    fn clinical_context_suppresses_explicit_label() {
        let rule = ExplicitPatternRule;
        assert!(rule.evaluate("doctor, i have a symptom near my penis").is_none());
        assert!(rule.evaluate("i want your penis").is_some());
    }

    #[test]
    fn confidence_saturates_below_one() {
        assert!(rule_confidence(1) < 1.0);
        assert!(rule_confidence(10) <= 0.95);
    }
}
