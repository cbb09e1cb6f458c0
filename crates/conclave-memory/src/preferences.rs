use conclave_store::Preferences;

/// Pattern-based recognizer over a user message (spec.md §4.5). Pure and
/// side-effect free: if nothing matches, the returned `Preferences` is
/// entirely `None` fields and the caller must not touch persisted state.
pub fn detect(message: &str) -> Preferences {
    let lower = message.to_lowercase();
    let mut prefs = Preferences::default();

    if contains_any(&lower, &["be more formal", "use formal language", "be professional"]) {
        prefs.formality = Some("formal".to_string());
    } else if contains_any(&lower, &["keep it casual", "talk casual", "be casual"]) {
        prefs.formality = Some("casual".to_string());
    }

    if contains_any(&lower, &["be enthusiastic", "more energy", "more excited"]) {
        prefs.tone = Some("enthusiastic".to_string());
    } else if contains_any(&lower, &["stay calm", "be calm", "keep it calm"]) {
        prefs.tone = Some("calm".to_string());
    } else if contains_any(&lower, &["be friendly", "be more friendly"]) {
        prefs.tone = Some("friendly".to_string());
    }

    if contains_any(&lower, &["use emojis", "add emojis", "more emojis"]) {
        prefs.emoji_usage = Some(true);
    } else if contains_any(&lower, &["no emojis", "stop using emojis", "don't use emojis"]) {
        prefs.emoji_usage = Some(false);
    }

    if contains_any(&lower, &["keep it brief", "short answers", "be brief", "be concise"]) {
        prefs.response_length = Some("brief".to_string());
    } else if contains_any(&lower, &["give me details", "be thorough", "be detailed"]) {
        prefs.response_length = Some("detailed".to_string());
    } else if contains_any(&lower, &["balanced answers", "medium length"]) {
        prefs.response_length = Some("balanced".to_string());
    }

    if contains_any(&lower, &["use analogies", "explain with analogies"]) {
        prefs.explanation_style = Some("analogies".to_string());
    } else if contains_any(&lower, &["keep it simple", "explain simply"]) {
        prefs.explanation_style = Some("simple".to_string());
    } else if contains_any(&lower, &["be technical", "more technical"]) {
        prefs.explanation_style = Some("technical".to_string());
    }

    if let Some(lang) = detect_language(&lower) {
        prefs.language = Some(lang);
    }

    prefs
}

fn contains_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

const LANGUAGE_NAMES: &[(&str, &str)] = &[
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("italian", "it"),
    ("portuguese", "pt"),
    ("japanese", "ja"),
];

fn detect_language(lower: &str) -> Option<String> {
    for marker in ["respond in ", "speak to me in ", "reply in "] {
        if let Some(idx) = lower.find(marker) {
            let rest = &lower[idx + marker.len()..];
            for (name, code) in LANGUAGE_NAMES {
                if rest.starts_with(name) {
                    return Some((*code).to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_casual_formality() {
        let p = detect("hey can you keep it casual from now on?");
        assert_eq!(p.formality, Some("casual".to_string()));
    }

    #[test]
    fn detects_no_match_as_all_none() {
        let p = detect("what time is it in tokyo?");
        assert_eq!(p, Preferences::default());
    }

    #[test]
    fn detects_language_preference() {
        let p = detect("please respond in spanish from now on");
        assert_eq!(p.language, Some("es".to_string()));
    }

    #[test]
    fn detects_multiple_fields_at_once() {
        let p = detect("be more formal and use emojis please");
        assert_eq!(p.formality, Some("formal".to_string()));
        assert_eq!(p.emoji_usage, Some(true));
    }
}
