// src/gate/mod.rs
//! News gate: decides whether a text is news at all before any verdict work is done.
//!
//! combined = rule_weight * rule_score + ai_weight * ai_score
//!
//! The rule score is additive over bands and clamped to [0,1]; the AI score is the
//! probability mass a zero-shot classifier puts on the three "news" labels. When no
//! zero-shot classifier is configured, or the call fails, the AI score is a neutral 0.5.
//! The bands are hand-tuned heuristics with no calibration data behind them.

pub mod features;

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::NewsGateConfig;
use crate::providers::ZeroShotClassifier;
use crate::text::{anon_hash, round_to, truncate_chars};

pub use features::{extract_features, is_title_case, KeywordCategory, NewsFeatures};

pub const NEWS_LABELS: [&str; 3] = ["news article", "headline", "breaking news"];
pub const NON_NEWS_LABELS: [&str; 3] = ["casual conversation", "random text", "advertisement"];

/// Zero-shot input cap (characters).
const ZERO_SHOT_MAX_CHARS: usize = 512;

/// Threshold used by `is_news_article`, lower than the default gate threshold.
pub const ARTICLE_THRESHOLD: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSnapshot {
    pub word_count: usize,
    pub news_keywords: usize,
    pub has_authority_figures: bool,
    pub has_reporting_language: bool,
    pub has_quotes: bool,
    pub rule_based_score: f32,
    /// `None` when the neutral fallback was used.
    pub ai_score: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDetectionResult {
    pub is_news: bool,
    pub confidence: f32,
    pub reason: String,
    /// Absent when the text was rejected before feature extraction.
    pub features: Option<FeatureSnapshot>,
}

impl NewsDetectionResult {
    fn rejected(reason: &str) -> Self {
        Self {
            is_news: false,
            confidence: 0.0,
            reason: reason.to_string(),
            features: None,
        }
    }
}

pub struct NewsGate {
    cfg: NewsGateConfig,
    zero_shot: Option<Arc<dyn ZeroShotClassifier>>,
    call_timeout: Duration,
}

impl NewsGate {
    pub fn new(
        cfg: NewsGateConfig,
        zero_shot: Option<Arc<dyn ZeroShotClassifier>>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            cfg,
            zero_shot,
            call_timeout,
        }
    }

    /// Rule-only gate (neutral AI score).
    pub fn rules_only(cfg: NewsGateConfig) -> Self {
        Self::new(cfg, None, Duration::from_secs(10))
    }

    pub fn threshold(&self) -> f32 {
        self.cfg.threshold
    }

    pub async fn detect_news(&self, text: &str) -> NewsDetectionResult {
        self.detect_news_with_threshold(text, self.cfg.threshold).await
    }

    pub async fn detect_news_with_threshold(&self, text: &str, threshold: f32) -> NewsDetectionResult {
        if text.trim().chars().count() < self.cfg.min_chars {
            return NewsDetectionResult::rejected("Text too short or empty");
        }

        let features = extract_features(text);
        let rule = rule_based_score(&features);
        let ai = self.ai_score(text).await;
        let ai_value = ai.unwrap_or(self.cfg.neutral_ai_score);

        let denom = (self.cfg.rule_weight + self.cfg.ai_weight).max(1e-6);
        let combined = ((self.cfg.rule_weight * rule + self.cfg.ai_weight * ai_value) / denom)
            .clamp(0.0, 1.0);
        let is_news = combined >= threshold;

        let reason = if is_news {
            detected_reason(&features)
        } else if features.word_count < 5 {
            "Text too short to be news".to_string()
        } else if features.total_news_keywords == 0 {
            "No news-related keywords found".to_string()
        } else {
            format!("Low news probability (score: {combined:.2})")
        };

        debug!(
            target: "gate",
            id = %anon_hash(text),
            rule, ai = ?ai, combined, threshold, is_news,
            "news gate evaluated"
        );

        NewsDetectionResult {
            is_news,
            confidence: round_to(combined, 3),
            reason,
            features: Some(FeatureSnapshot {
                word_count: features.word_count,
                news_keywords: features.total_news_keywords,
                has_authority_figures: features.count(KeywordCategory::Authority) > 0,
                has_reporting_language: features.count(KeywordCategory::Reporting) > 0,
                has_quotes: features.has_quotes,
                rule_based_score: round_to(rule, 3),
                ai_score: ai.map(|a| round_to(a, 3)),
            }),
        }
    }

    /// Long, multi-sentence text that also passes the gate at the article threshold.
    pub async fn is_news_article(&self, text: &str) -> bool {
        text.split_whitespace().count() > 30
            && text.matches('.').count() >= 2
            && self
                .detect_news_with_threshold(text, ARTICLE_THRESHOLD)
                .await
                .is_news
    }

    /// Probability mass on the news labels, or `None` if unavailable.
    async fn ai_score(&self, text: &str) -> Option<f32> {
        let zs = self.zero_shot.as_ref()?;
        let labels: Vec<&str> = NEWS_LABELS.iter().chain(NON_NEWS_LABELS.iter()).copied().collect();
        let input = truncate_chars(text, ZERO_SHOT_MAX_CHARS);

        match tokio::time::timeout(self.call_timeout, zs.score(input, &labels)).await {
            Ok(Ok(scores)) => {
                let mass: f32 = scores
                    .iter()
                    .filter(|(label, _)| NEWS_LABELS.contains(&label.as_str()))
                    .map(|(_, s)| *s)
                    .sum();
                Some(mass.clamp(0.0, 1.0))
            }
            Ok(Err(e)) => {
                warn!(target: "gate", service = "zero_shot", error = %e, "zero-shot failed, using neutral score");
                counter!("upstream_fallback_total", "service" => "zero_shot").increment(1);
                None
            }
            Err(_) => {
                warn!(target: "gate", service = "zero_shot", "zero-shot timed out, using neutral score");
                counter!("upstream_fallback_total", "service" => "zero_shot").increment(1);
                None
            }
        }
    }
}

/// Additive rule score over length, keyword, structure and style bands, clamped to [0,1].
pub fn rule_based_score(f: &NewsFeatures) -> f32 {
    let mut score = 0.0f32;

    // Length: headline / short article / full article
    score += match f.word_count {
        5..=50 => 0.3,
        51..=500 => 0.4,
        n if n > 500 => 0.5,
        _ => 0.0,
    };

    if f.total_news_keywords >= 3 {
        score += 0.3;
    } else if f.total_news_keywords >= 1 {
        score += 0.15;
    }

    // Authority + reporting together are the strongest cue
    let authority = f.count(KeywordCategory::Authority) > 0;
    let reporting = f.count(KeywordCategory::Reporting) > 0;
    if authority && reporting {
        score += 0.25;
    } else if authority || reporting {
        score += 0.15;
    }

    if f.has_quotes {
        score += 0.1;
    }
    if f.has_timestamps {
        score += 0.1;
    }
    if f.has_locations {
        score += 0.1;
    }
    if f.title_case_ratio > 0.3 {
        score += 0.1;
    }
    if (8.0..=25.0).contains(&f.avg_words_per_sentence) {
        score += 0.1;
    }

    score.clamp(0.0, 1.0)
}

fn detected_reason(f: &NewsFeatures) -> String {
    let mut indicators = Vec::new();
    if f.count(KeywordCategory::Authority) > 0 {
        indicators.push("authority figures mentioned");
    }
    if f.count(KeywordCategory::Reporting) > 0 {
        indicators.push("reporting language");
    }
    if f.has_quotes {
        indicators.push("quoted statements");
    }
    if f.has_timestamps {
        indicators.push("temporal references");
    }
    if indicators.is_empty() {
        "News detected. Key indicators: general news structure".to_string()
    } else {
        format!("News detected. Key indicators: {}", indicators.join(", "))
    }
}

/// Quick headline heuristic: 4–25 words, some title-case word, not a conversational opener.
pub fn is_news_headline(text: &str) -> bool {
    let words: Vec<&str> = text.split_whitespace().collect();
    let lower = text.to_lowercase();
    let conversational = ["hi", "hello", "i", "you", "what", "how"]
        .iter()
        .any(|p| lower.starts_with(p));
    (4..=25).contains(&words.len()) && words.iter().any(|w| is_title_case(w)) && !conversational
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> NewsGate {
        NewsGate::rules_only(NewsGateConfig::default())
    }

    #[tokio::test]
    async fn short_text_short_circuits() {
        for t in ["", "  ", "ab", " a \n"] {
            let r = gate().detect_news(t).await;
            assert!(!r.is_news);
            assert_eq!(r.confidence, 0.0);
            assert!(r.features.is_none());
        }
    }

    #[tokio::test]
    async fn casual_greeting_is_not_news() {
        let r = gate().detect_news("Hi how are you").await;
        assert!(!r.is_news);
        assert_eq!(r.reason, "Text too short to be news");
        // rule score 0, neutral AI 0.5 → 0.3 * 0.5
        assert!((r.confidence - 0.15).abs() < 1e-6);
        assert_eq!(r.features.unwrap().ai_score, None);
    }

    #[test]
    fn rule_score_is_clamped() {
        let f = extract_features(
            "The president said in 2024 that \"officials confirmed\" the agency report, \
             according to sources in Paris, France. The Senator announced the plan today.",
        );
        let s = rule_based_score(&f);
        assert!((0.0..=1.0).contains(&s));
        assert!((s - 1.0).abs() < 1e-6);
    }

    #[test]
    fn headline_heuristic() {
        assert!(is_news_headline("Senate Passes Budget Bill After Long Debate"));
        assert!(!is_news_headline("how do I bake bread"));
        assert!(!is_news_headline("Too short"));
    }
}
