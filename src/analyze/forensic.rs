// src/analyze/forensic.rs
//! Forensic analysis: pure text → metrics, red flags and a credibility score.
//!
//! credibility = base - penalty * |red_flags| (+ bonuses for citations, specific details,
//! quotes), clamped to [0,1]. Like the news score, these weights are uncalibrated heuristics.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::config::ForensicConfig;
use crate::text::{matched, round_to};

static RE_CITATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"according to|sources say|reported by|as per").expect("citation regex"));
static RE_DETAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b\d{1,2}:\d{2}\b|\b\d{1,2}/\d{1,2}/\d{4}\b|\$\d+|\d+%").expect("detail regex")
});
static RE_URL: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://\S+").expect("url regex"));

/// Ordered the way the rules are evaluated, so iteration order is stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedFlag {
    ExcessiveExclamations,
    ExcessiveCapitals,
    ClickbaitLanguage,
    OverlyLongSentences,
    NoSourceAttribution,
}

impl RedFlag {
    pub fn code(self) -> &'static str {
        match self {
            Self::ExcessiveExclamations => "excessive_exclamations",
            Self::ExcessiveCapitals => "excessive_capitals",
            Self::ClickbaitLanguage => "clickbait_language",
            Self::OverlyLongSentences => "overly_long_sentences",
            Self::NoSourceAttribution => "no_source_attribution",
        }
    }

    /// Reader-facing phrase.
    pub fn description(self) -> &'static str {
        match self {
            Self::ExcessiveExclamations => "excessive use of exclamation marks",
            Self::ExcessiveCapitals => "overuse of capital letters",
            Self::ClickbaitLanguage => "clickbait-style language patterns",
            Self::OverlyLongSentences => "unusually long and complex sentences",
            Self::NoSourceAttribution => "lack of credible source citations",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensationalCategory {
    Clickbait,
    Emotional,
    Urgency,
    Superlatives,
}

impl SensationalCategory {
    pub const ALL: [SensationalCategory; 4] = [
        Self::Clickbait,
        Self::Emotional,
        Self::Urgency,
        Self::Superlatives,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Clickbait => "clickbait",
            Self::Emotional => "emotional",
            Self::Urgency => "urgency",
            Self::Superlatives => "superlatives",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Self::Clickbait => &[
                "shocking",
                "unbelievable",
                "amazing",
                "incredible",
                "mind-blowing",
                "you won't believe",
                "what happened next",
                "secret revealed",
            ],
            Self::Emotional => &["outrage", "fury", "scandal", "bombshell", "explosive", "devastating"],
            Self::Urgency => &["breaking", "urgent", "alert", "emergency", "crisis", "immediate"],
            Self::Superlatives => &["best", "worst", "never", "always", "everyone", "nobody", "all"],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasicMetrics {
    pub character_count: usize,
    pub word_count: usize,
    pub sentence_count: usize,
    /// Rounded to 1 decimal.
    pub avg_sentence_length: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinguisticMetrics {
    /// Rounded to 3 decimals.
    pub uppercase_ratio: f32,
    pub exclamation_count: usize,
    pub question_count: usize,
    /// First 5 all-caps words longer than 3 characters.
    pub uppercase_words: Vec<String>,
    pub has_quotes: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentMetrics {
    /// Matched keywords per category; every category is present, possibly empty.
    pub sensational_keywords: BTreeMap<SensationalCategory, Vec<String>>,
    pub source_citations: usize,
    pub specific_details: usize,
    pub urls_found: usize,
}

impl ContentMetrics {
    /// Categories with at least one hit, in category order.
    pub fn fired_categories(&self) -> Vec<SensationalCategory> {
        self.sensational_keywords
            .iter()
            .filter(|(_, hits)| !hits.is_empty())
            .map(|(cat, _)| *cat)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Assessment {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredibilityAssessment {
    pub red_flags: BTreeSet<RedFlag>,
    /// In [0,1], rounded to 3 decimals.
    pub credibility_score: f32,
    pub assessment: Assessment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForensicReport {
    pub basic_metrics: BasicMetrics,
    pub linguistic_analysis: LinguisticMetrics,
    pub content_analysis: ContentMetrics,
    pub credibility_assessment: CredibilityAssessment,
}

impl ForensicReport {
    pub fn red_flags(&self) -> &BTreeSet<RedFlag> {
        &self.credibility_assessment.red_flags
    }

    pub fn credibility_score(&self) -> f32 {
        self.credibility_assessment.credibility_score
    }
}

#[derive(Debug, Clone, Default)]
pub struct ForensicAnalyzer {
    cfg: ForensicConfig,
}

impl ForensicAnalyzer {
    pub fn new(cfg: ForensicConfig) -> Self {
        Self { cfg }
    }

    pub fn analyze(&self, text: &str) -> ForensicReport {
        let cfg = &self.cfg;
        let words: Vec<&str> = text.split_whitespace().collect();
        let sentence_count = text.split('.').filter(|s| !s.trim().is_empty()).count();
        let char_count = text.chars().count();

        let avg_sentence_length = words.len() as f32 / sentence_count.max(1) as f32;
        let upper_chars = text.chars().filter(|c| c.is_uppercase()).count();
        let uppercase_ratio = upper_chars as f32 / char_count.max(1) as f32;
        let exclamation_count = text.matches('!').count();
        let question_count = text.matches('?').count();
        let has_quotes = text.contains('"') || text.contains('\'');
        let uppercase_words: Vec<String> = words
            .iter()
            .filter(|w| w.chars().count() > 3 && is_all_caps(w))
            .take(5)
            .map(|w| w.to_string())
            .collect();

        let lower = text.to_lowercase();
        let sensational_keywords: BTreeMap<SensationalCategory, Vec<String>> = SensationalCategory::ALL
            .iter()
            .map(|&cat| {
                let hits = matched(&lower, cat.keywords())
                    .into_iter()
                    .map(str::to_string)
                    .collect();
                (cat, hits)
            })
            .collect();
        let source_citations = RE_CITATION.find_iter(&lower).count();
        let specific_details = RE_DETAIL.find_iter(text).count();
        let urls_found = RE_URL.find_iter(text).count();

        let mut red_flags = BTreeSet::new();
        if exclamation_count > cfg.max_exclamations {
            red_flags.insert(RedFlag::ExcessiveExclamations);
        }
        if uppercase_ratio > cfg.max_uppercase_ratio {
            red_flags.insert(RedFlag::ExcessiveCapitals);
        }
        if sensational_keywords
            .get(&SensationalCategory::Clickbait)
            .is_some_and(|v| !v.is_empty())
        {
            red_flags.insert(RedFlag::ClickbaitLanguage);
        }
        if avg_sentence_length > cfg.max_avg_sentence_len {
            red_flags.insert(RedFlag::OverlyLongSentences);
        }
        if source_citations == 0 && words.len() > cfg.attribution_min_words {
            red_flags.insert(RedFlag::NoSourceAttribution);
        }

        let mut score = cfg.base_credibility - cfg.red_flag_penalty * red_flags.len() as f32;
        if source_citations > 0 {
            score += cfg.citation_bonus;
        }
        if specific_details > 0 {
            score += cfg.detail_bonus;
        }
        if has_quotes {
            score += cfg.quote_bonus;
        }
        let score = score.clamp(0.0, 1.0);
        let assessment = if score > cfg.high_cutoff {
            Assessment::High
        } else if score > cfg.medium_cutoff {
            Assessment::Medium
        } else {
            Assessment::Low
        };

        ForensicReport {
            basic_metrics: BasicMetrics {
                character_count: char_count,
                word_count: words.len(),
                sentence_count,
                avg_sentence_length: round_to(avg_sentence_length, 1),
            },
            linguistic_analysis: LinguisticMetrics {
                uppercase_ratio: round_to(uppercase_ratio, 3),
                exclamation_count,
                question_count,
                uppercase_words,
                has_quotes,
            },
            content_analysis: ContentMetrics {
                sensational_keywords,
                source_citations,
                specific_details,
                urls_found,
            },
            credibility_assessment: CredibilityAssessment {
                red_flags,
                credibility_score: round_to(score, 3),
                assessment,
            },
        }
    }
}

/// At least one cased character and no lowercase ones ("NASA", "U.S.A.", "COVID-19").
fn is_all_caps(word: &str) -> bool {
    word.chars().any(char::is_uppercase) && !word.chars().any(char::is_lowercase)
}
