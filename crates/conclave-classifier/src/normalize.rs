/// Result of normalizing a raw message: the cleaned text plus any
/// indicators worth recording even though normalization itself never
/// decides a label.
pub struct Normalized {
    pub text: String,
    pub indicators: Vec<String>,
}

const LEETSPEAK: &[(char, char)] = &[
    ('0', 'o'),
    ('1', 'i'),
    ('3', 'e'),
    ('4', 'a'),
    ('5', 's'),
    ('7', 't'),
    ('8', 'b'),
    ('@', 'a'),
    ('$', 's'),
];

const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{FEFF}'];

const EMOJI_TOKENS: &[(&str, &str)] = &[
    ("\u{1F346}", " eggplant "),
    ("\u{1F351}", " peach "),
    ("\u{1F4A6}", " sweat_drops "),
    ("\u{1F525}", " fire "),
];

/// Normalize a raw user message per spec.md §4.1 step 1.
pub fn normalize(raw: &str) -> Normalized {
    let mut indicators = Vec::new();

    let mut text = raw.to_lowercase();

    if ZERO_WIDTH.iter().any(|c| text.contains(*c)) {
        text.retain(|c| !ZERO_WIDTH.contains(&c));
        indicators.push("zero_width_chars_stripped".to_string());
    }

    for (emoji, token) in EMOJI_TOKENS {
        if text.contains(emoji) {
            text = text.replace(emoji, token);
            indicators.push("emoji_decoded".to_string());
        }
    }

    // Only decode leetspeak inside tokens that already contain a letter —
    // a standalone numeric run (e.g. an age like "15") is a number, not an
    // obfuscated word, and must reach the age-lexicon rules unchanged.
    let mut leet_applied = false;
    let tokens: Vec<String> = text
        .split_whitespace()
        .map(|tok| {
            if !tok.chars().any(|c| c.is_ascii_alphabetic()) {
                return tok.to_string();
            }
            tok.chars()
                .map(|c| match LEETSPEAK.iter().find(|(d, _)| *d == c) {
                    Some((_, l)) => {
                        leet_applied = true;
                        *l
                    }
                    None => c,
                })
                .collect()
        })
        .collect();
    text = tokens.join(" ");
    if leet_applied {
        indicators.push("leetspeak_normalized".to_string());
    }

    let collapsed: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    text = collapsed;

    Normalized { text, indicators }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_whitespace_and_lowercases() {
        let n = normalize("  HeLLo   World  ");
        assert_eq!(n.text, "hello world");
    }

    #[test]
    fn maps_leetspeak_digits_to_letters() {
        let n = normalize("h3ll0 w0rld");
        assert_eq!(n.text, "hello world");
        assert!(n.indicators.contains(&"leetspeak_normalized".to_string()));
    }

    #[test]
    fn strips_zero_width_characters() {
        let n = normalize("hel\u{200B}lo");
        assert_eq!(n.text, "hello");
    }

    #[test]
    fn decodes_known_emoji_to_tokens() {
        let n = normalize("send \u{1F346} pics");
        assert!(n.text.contains("eggplant"));
    }
}
