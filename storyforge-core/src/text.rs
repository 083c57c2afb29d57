//! Plain-text helpers shared by counting, element extraction and scoring.
//!
//! Scene bodies come from a rich-text editor and may carry HTML markup; all
//! heuristics in this crate operate on the stripped text.

use once_cell::sync::Lazy;
use regex::Regex;

static BLOCK_TAG_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<\s*(br|/p|/div|/h[1-6]|/li|/blockquote)\b[^>]*>").expect("valid block tag regex")
});
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid tag regex"));
static INLINE_WS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t\r\f]+").expect("valid ws regex"));
static BLANK_LINES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\n\s*(\n\s*)+").expect("valid blank line regex"));

/// Strip markup from a scene body, keeping paragraph breaks.
pub fn plain_text(content: &str) -> String {
    if !content.contains('<') && !content.contains('&') {
        return content.trim().to_string();
    }

    let text = BLOCK_TAG_RE.replace_all(content, "\n");
    let text = TAG_RE.replace_all(&text, "");
    let text = decode_entities(&text);
    let text = INLINE_WS_RE.replace_all(&text, " ");
    let text = BLANK_LINES_RE.replace_all(&text, "\n\n");

    text.lines()
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Number of whitespace-separated words in the plain text.
pub fn word_count(content: &str) -> usize {
    plain_text(content).split_whitespace().count()
}

/// Number of characters (Unicode scalar values) in the plain text.
pub fn char_count(content: &str) -> usize {
    plain_text(content).chars().count()
}

/// A normalized word token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    /// Lowercase form with surrounding punctuation removed.
    pub norm: String,
    /// The raw token closed a sentence (`.`, `!`, `?`, `;` or `:`).
    pub ends_clause: bool,
}

/// Split text into lowercase word tokens, dropping tokens that are pure punctuation.
pub fn words(text: &str) -> Vec<Word> {
    text.split_whitespace()
        .filter_map(|raw| {
            let norm: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if norm.is_empty() {
                return None;
            }
            let ends_clause = raw
                .trim_end_matches(|c: char| matches!(c, '"' | '\'' | ')' | '\u{201d}' | '\u{2019}'))
                .ends_with(['.', '!', '?', ';', ':']);
            Some(Word { norm, ends_clause })
        })
        .collect()
}

/// Count non-overlapping occurrences of `needle` in `haystack` (both expected lowercase).
pub fn count_occurrences(haystack: &str, needle: &str) -> usize {
    if needle.is_empty() {
        return 0;
    }
    haystack.matches(needle).count()
}

/// The last `max_chars` characters of `text`, cut on a char boundary.
pub fn tail_chars(text: &str, max_chars: usize) -> &str {
    let total = text.chars().count();
    if total <= max_chars {
        return text;
    }
    let skip = total - max_chars;
    match text.char_indices().nth(skip) {
        Some((idx, _)) => &text[idx..],
        None => "",
    }
}
