use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of safety/explicitness labels (spec.md §4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    // Ordered least to most restrictive so `max` picks the tie-break winner.
    Safe,
    Suggestive,
    ExplicitConsensualAdult,
    ExplicitFetish,
    Nonconsensual,
    MinorRisk,
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Label::Safe => "SAFE",
            Label::Suggestive => "SUGGESTIVE",
            Label::ExplicitConsensualAdult => "EXPLICIT_CONSENSUAL_ADULT",
            Label::ExplicitFetish => "EXPLICIT_FETISH",
            Label::Nonconsensual => "NONCONSENSUAL",
            Label::MinorRisk => "MINOR_RISK",
        };
        write!(f, "{s}")
    }
}

impl Label {
    pub fn is_explicit(&self) -> bool {
        matches!(self, Label::ExplicitConsensualAdult | Label::ExplicitFetish)
    }
}

/// Output of a single classification pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierOutput {
    pub label: Label,
    pub confidence: f64,
    pub indicators: Vec<String>,
    /// Side-information gathered during normalization and rule matching,
    /// kept separate from `indicators` since it describes *signals*
    /// (e.g. "clinical_context_detected") rather than rule names.
    pub safety_signals: Vec<String>,
}
