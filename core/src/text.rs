//! Small text helpers shared by the matcher, the inferencer and the selector.

use std::sync::LazyLock;

use regex::Regex;

static SENTENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^.!?]+[.!?]*").expect("sentence regex must compile"));

/// Lowercase, fold typographic quotes to ASCII and collapse whitespace.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        })
        .collect();
    collapse_whitespace(&folded).to_lowercase()
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Split into sentences, keeping terminal punctuation. Whitespace-only
/// fragments are dropped.
pub fn sentences(text: &str) -> Vec<String> {
    let collapsed = collapse_whitespace(text);
    SENTENCE_RE
        .find_iter(&collapsed)
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Keep at most `max` characters (not bytes).
pub fn clamp_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_folds_curly_quotes_and_case() {
        assert_eq!(normalize("  I\u{2019}d   DECLINE "), "i'd decline");
    }

    #[test]
    fn sentences_keep_punctuation_and_trailing_fragment() {
        let parts = sentences("It arrived Monday. Was that wrong?  Maybe not");
        assert_eq!(parts, vec!["It arrived Monday.", "Was that wrong?", "Maybe not"]);
    }

    #[test]
    fn clamp_chars_counts_characters_not_bytes() {
        assert_eq!(clamp_chars("£££££", 2), "££");
        assert_eq!(clamp_chars("abc", 10), "abc");
    }
}
