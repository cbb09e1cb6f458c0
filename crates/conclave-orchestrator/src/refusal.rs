/// Canonical assistant text for a soft refusal (nonconsensual content,
/// or an explicit route whose age-verification attempts are exhausted).
pub const SOFT_REFUSAL_TEXT: &str =
    "I can't continue with that request. Let's talk about something else.";

/// Canonical assistant text for a hard refusal (minor-risk content).
/// Always wins over any lock-in or prior routing state.
pub const HARD_REFUSAL_TEXT: &str =
    "I can't help with that. If you or someone else is in danger, please contact local emergency services.";

/// The literal age-verification question (spec.md §8 scenario 2 requires
/// this exact string to appear in the assistant turn).
pub const AGE_VERIFICATION_QUESTION: &str = "Are you 18 years of age or older?";
