// src/gate/features.rs
//! Feature extraction for the news gate: counts, keyword categories, structural cues.
//! Pure; no I/O.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::text::count_hits;

static RE_YEAR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(20\d{2}|19\d{2})\b").expect("year regex"));
static RE_PLACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+,\s*[A-Z][a-z]+\b").expect("place regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordCategory {
    Temporal,
    Authority,
    Reporting,
    Locations,
    Organizations,
}

impl KeywordCategory {
    pub const ALL: [KeywordCategory; 5] = [
        Self::Temporal,
        Self::Authority,
        Self::Reporting,
        Self::Locations,
        Self::Organizations,
    ];

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Temporal => &["today", "yesterday", "breaking", "latest", "recent", "now", "just"],
            Self::Authority => &[
                "president",
                "minister",
                "official",
                "spokesperson",
                "government",
                "police",
                "court",
                "judge",
                "senator",
                "congress",
            ],
            Self::Reporting => &[
                "said",
                "reported",
                "according",
                "sources",
                "confirmed",
                "announced",
                "revealed",
                "disclosed",
                "stated",
            ],
            Self::Locations => &["city", "state", "country", "national", "local", "international"],
            Self::Organizations => &["company", "corporation", "department", "agency", "committee"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewsFeatures {
    pub word_count: usize,
    /// Non-empty '.'-separated pieces, at least 1.
    pub sentence_count: usize,
    /// Words divided by the raw number of '.'-separated pieces (empty pieces included).
    pub avg_words_per_sentence: f32,
    pub category_counts: BTreeMap<KeywordCategory, usize>,
    pub total_news_keywords: usize,
    pub has_quotes: bool,
    /// A 19xx/20xx year appears.
    pub has_timestamps: bool,
    /// A "City, Place" pattern appears.
    pub has_locations: bool,
    pub title_case_ratio: f32,
}

impl NewsFeatures {
    pub fn count(&self, cat: KeywordCategory) -> usize {
        self.category_counts.get(&cat).copied().unwrap_or(0)
    }
}

pub fn extract_features(text: &str) -> NewsFeatures {
    let words: Vec<&str> = text.split_whitespace().collect();
    let pieces = text.split('.').count();
    let non_empty = text.split('.').filter(|s| !s.trim().is_empty()).count();

    let lower = text.to_lowercase();
    let category_counts: BTreeMap<KeywordCategory, usize> = KeywordCategory::ALL
        .iter()
        .map(|&cat| (cat, count_hits(&lower, cat.keywords())))
        .collect();
    let total_news_keywords = category_counts.values().sum();

    let titled = words.iter().filter(|w| is_title_case(w)).count();

    NewsFeatures {
        word_count: words.len(),
        sentence_count: non_empty.max(1),
        avg_words_per_sentence: words.len() as f32 / pieces.max(1) as f32,
        category_counts,
        total_news_keywords,
        has_quotes: text.contains('"') || text.contains('\''),
        has_timestamps: RE_YEAR.is_match(text),
        has_locations: RE_PLACE.is_match(text),
        title_case_ratio: titled as f32 / words.len().max(1) as f32,
    }
}

/// Title case in the usual sense: cased runs start upper and continue lower,
/// with at least one cased character. "Hello," and "U.S." qualify; "NASA" does not.
pub fn is_title_case(word: &str) -> bool {
    let mut seen_cased = false;
    let mut prev_cased = false;
    for c in word.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            seen_cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            seen_cased = true;
        } else {
            prev_cased = false;
        }
    }
    seen_cased
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_case_rules() {
        assert!(is_title_case("Hello,"));
        assert!(is_title_case("U.S."));
        assert!(is_title_case("A"));
        assert!(!is_title_case("NASA"));
        assert!(!is_title_case("hello"));
        assert!(!is_title_case("McDonald"));
        assert!(!is_title_case("2024"));
    }

    #[test]
    fn counts_and_structure() {
        let f = extract_features("The president said today. Officials confirmed it in 2024.");
        assert_eq!(f.word_count, 9);
        assert_eq!(f.sentence_count, 2);
        // three raw pieces: two sentences plus the empty tail after the final period
        assert!((f.avg_words_per_sentence - 3.0).abs() < 1e-6);
        assert_eq!(f.count(KeywordCategory::Authority), 2); // president, official
        assert_eq!(f.count(KeywordCategory::Reporting), 2); // said, confirmed
        assert_eq!(f.count(KeywordCategory::Temporal), 1);
        assert!(f.has_timestamps);
        assert!(!f.has_quotes);
    }

    #[test]
    fn location_pattern() {
        assert!(extract_features("Flooding hit Houston, Texas overnight").has_locations);
        assert!(!extract_features("flooding hit houston overnight").has_locations);
    }

    #[test]
    fn empty_text_is_safe() {
        let f = extract_features("");
        assert_eq!(f.word_count, 0);
        assert_eq!(f.sentence_count, 1);
        assert_eq!(f.title_case_ratio, 0.0);
    }
}
