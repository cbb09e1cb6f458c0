/// Curated word lists backing the classifier's pattern rules. Kept small
/// and explicit rather than loaded from a file — the rule pipeline is the
/// part under test, not lexicon completeness.
pub const MINOR_AGE_TERMS: &[&str] = &[
    "minor", "teen", "teenager", "high school", "middle school", "13", "14", "15", "16", "17",
];

pub const NONCONSENT_TERMS: &[&str] = &[
    "forced",
    "force her",
    "force him",
    "without consent",
    "non-consensual",
    "nonconsensual",
    "against her will",
    "against his will",
];

pub const SEXUAL_CONTEXT_TERMS: &[&str] =
    &["sex", "sexual", "naked", "nude", "fuck", "orgasm", "aroused", "turned on"];

pub const EXPLICIT_ANATOMICAL_TERMS: &[&str] =
    &["penis", "vagina", "breasts", "genitals", "orgasm", "masturbat"];

pub const EXPLICIT_ACT_TERMS: &[&str] = &["fuck", "fucking", "have sex", "sex with me", "blowjob"];

pub const FETISH_TERMS: &[&str] = &["bondage", "bdsm", "spanking", "roleplay as a pet", "latex fetish"];

pub const CLINICAL_CONTEXT_TERMS: &[&str] = &["doctor", "symptom", "diagnosis", "physician", "clinic"];

pub const SUGGESTIVE_TERMS: &[&str] =
    &["flirt", "you're so hot", "kiss you", "cuddle", "wink", "tease"];

pub fn contains_any(text: &str, terms: &[&str]) -> Vec<String> {
    terms
        .iter()
        .filter(|t| text.contains(**t))
        .map(|t| t.to_string())
        .collect()
}
