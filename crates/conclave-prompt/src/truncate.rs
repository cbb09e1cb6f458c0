/// Truncate `content` to at most `max_chars`, keeping a 70%/20% head/tail
/// split around a marker line, respecting whitespace boundaries so words
/// are never cut mid-token. A no-op if `content` already fits.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    if content.len() <= max_chars {
        return content.to_string();
    }

    const MARKER: &str = "\n...[truncated]...\n";
    let budget = max_chars.saturating_sub(MARKER.len());
    let head_budget = (budget as f64 * 0.7) as usize;
    let tail_budget = budget - head_budget;

    let head = take_head(content, head_budget);
    let tail = take_tail(content, tail_budget);

    format!("{head}{MARKER}{tail}")
}

fn take_head(s: &str, budget: usize) -> &str {
    if s.len() <= budget {
        return s;
    }
    let mut cut = budget;
    while cut > 0 && !s.is_char_boundary(cut) {
        cut -= 1;
    }
    match s[..cut].rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &s[..idx],
        _ => &s[..cut],
    }
}

fn take_tail(s: &str, budget: usize) -> &str {
    if s.len() <= budget {
        return s;
    }
    let mut cut = s.len() - budget;
    while cut < s.len() && !s.is_char_boundary(cut) {
        cut += 1;
    }
    match s[cut..].find(char::is_whitespace) {
        Some(idx) => &s[cut + idx..],
        None => &s[cut..],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_content_is_unchanged() {
        assert_eq!(truncate_content("hello", 100), "hello");
    }

    #[test]
    fn long_content_is_truncated_with_marker() {
        let content = "a".repeat(50) + " " + &"b".repeat(50);
        let out = truncate_content(&content, 40);
        assert!(out.contains("...[truncated]..."));
        assert!(out.len() <= content.len());
    }

    #[test]
    fn never_splits_inside_a_multibyte_char() {
        let content = "é".repeat(200);
        let out = truncate_content(&content, 40);
        assert!(out.is_char_boundary(0));
    }
}
