// src/text.rs
//! Small text helpers shared by the pipeline stages.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Anonymized id for log lines: first 6 bytes of SHA-256, hex. Raw text is never logged.
pub fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// First `max` characters (not bytes).
pub fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// First `max` characters, with "..." appended when something was cut.
pub fn summarize(s: &str, max: usize) -> String {
    let head = truncate_chars(s, max);
    if head.len() < s.len() {
        format!("{head}...")
    } else {
        head.to_string()
    }
}

/// Decode HTML entities and collapse whitespace runs into single spaces.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let decoded = decoded
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    RE_WS.replace_all(&decoded, " ").trim().to_string()
}

/// Case-insensitive substring hits: how many `keywords` occur in `text_lower`.
pub fn count_hits(text_lower: &str, keywords: &[&str]) -> usize {
    keywords.iter().filter(|kw| text_lower.contains(*kw)).count()
}

/// Keywords from `keywords` that occur in `text_lower`, in table order.
pub fn matched<'a>(text_lower: &str, keywords: &[&'a str]) -> Vec<&'a str> {
    keywords
        .iter()
        .copied()
        .filter(|kw| text_lower.contains(kw))
        .collect()
}

pub fn round_to(x: f32, places: i32) -> f32 {
    let f = 10f32.powi(places);
    (x * f).round() / f
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(truncate_chars("", 3), "");
    }

    #[test]
    fn summarize_marks_cut() {
        assert_eq!(summarize("abcdef", 3), "abc...");
        assert_eq!(summarize("abc", 3), "abc");
    }

    #[test]
    fn normalize_decodes_and_collapses() {
        assert_eq!(
            normalize_text("  Fed&nbsp;&amp; \n\t\u{201C}markets\u{201D} "),
            "Fed & \"markets\""
        );
    }

    #[test]
    fn anon_hash_is_stable_and_short() {
        let a = anon_hash("same text");
        assert_eq!(a, anon_hash("same text"));
        assert_eq!(a.len(), 12);
        assert_ne!(a, anon_hash("other text"));
    }

    #[test]
    fn substring_hits_are_counted_once_per_keyword() {
        assert_eq!(count_hits("breaking: just in, breaking", &["breaking", "just", "today"]), 2);
        assert_eq!(matched("the best of all", &["best", "never", "all"]), vec!["best", "all"]);
    }
}
