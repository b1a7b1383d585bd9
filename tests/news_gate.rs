// tests/news_gate.rs
use fake_news_analyzer::config::NewsGateConfig;
use fake_news_analyzer::gate::{is_news_headline, NewsGate};
use fake_news_analyzer::providers::{FailingProvider, FixedZeroShot};
use std::sync::Arc;
use std::time::Duration;

const CLICKBAIT: &str =
    "SHOCKING!!!! The president said the government is hiding the truth about the city water supply!";

const WIRE_STORY: &str = "WASHINGTON (Reuters) - The president announced on Monday that the government will \
expand rural broadband funding in 2024, according to officials. The department said the agency confirmed \
the program will reach every state. A spokesperson told reporters that \"the plan is ready\" and more \
details follow next week.";

fn rules_only() -> NewsGate {
    NewsGate::rules_only(NewsGateConfig::default())
}

#[tokio::test]
async fn greeting_is_rejected_as_too_short() {
    let r = rules_only().detect_news("Hi how are you").await;
    assert!(!r.is_news);
    assert_eq!(r.reason, "Text too short to be news");
    // rule score 0, neutral AI 0.5 at weight 0.3
    assert!((r.confidence - 0.15).abs() < 1e-6);
    let f = r.features.expect("features present past the length check");
    assert_eq!(f.word_count, 4);
    assert_eq!(f.ai_score, None);
}

#[tokio::test]
async fn empty_input_has_no_features() {
    let r = rules_only().detect_news("   ").await;
    assert!(!r.is_news);
    assert_eq!(r.reason, "Text too short or empty");
    assert_eq!(r.confidence, 0.0);
    assert!(r.features.is_none());
}

#[tokio::test]
async fn keywordless_text_reason() {
    let r = rules_only().detect_news("the cat sat on the mat quietly").await;
    assert!(!r.is_news);
    assert_eq!(r.reason, "No news-related keywords found");
}

#[tokio::test]
async fn weak_text_reports_its_score() {
    let r = rules_only().detect_news("my cat said hello to me").await;
    assert!(!r.is_news);
    assert_eq!(r.reason, "Low news probability (score: 0.57)");
}

#[tokio::test]
async fn clickbait_still_passes_the_gate() {
    let r = rules_only().detect_news(CLICKBAIT).await;
    assert!(r.is_news);
    assert!((r.confidence - 0.745).abs() < 1e-3);
    assert_eq!(
        r.reason,
        "News detected. Key indicators: authority figures mentioned, reporting language"
    );
    let f = r.features.unwrap();
    assert!(f.has_authority_figures && f.has_reporting_language);
    assert!(!f.has_quotes);
}

#[tokio::test]
async fn wire_story_is_news_with_full_rule_score() {
    let r = rules_only().detect_news(WIRE_STORY).await;
    assert!(r.is_news);
    let f = r.features.unwrap();
    assert_eq!(f.rule_based_score, 1.0);
    assert!((r.confidence - 0.85).abs() < 1e-3);
    assert!(r.reason.contains("quoted statements"));
    assert!(r.reason.contains("temporal references"));
}

#[tokio::test]
async fn zero_shot_mass_feeds_the_combined_score() {
    let gate = NewsGate::new(
        NewsGateConfig::default(),
        Some(Arc::new(FixedZeroShot { news_mass: 1.0 })),
        Duration::from_secs(1),
    );
    let r = gate.detect_news("Hi how are you").await;
    assert!(!r.is_news);
    assert!((r.confidence - 0.3).abs() < 1e-6);
    assert_eq!(r.features.unwrap().ai_score, Some(1.0));
}

#[tokio::test]
async fn failing_zero_shot_falls_back_to_neutral() {
    let gate = NewsGate::new(
        NewsGateConfig::default(),
        Some(Arc::new(FailingProvider { service: "zero_shot" })),
        Duration::from_secs(1),
    );
    let with_failure = gate.detect_news(CLICKBAIT).await;
    let baseline = rules_only().detect_news(CLICKBAIT).await;
    assert_eq!(with_failure.confidence, baseline.confidence);
    assert_eq!(with_failure.features.unwrap().ai_score, None);
}

#[tokio::test]
async fn threshold_override_moves_the_decision() {
    let gate = rules_only();
    assert!(!gate.detect_news_with_threshold(CLICKBAIT, 0.8).await.is_news);
    assert!(gate.detect_news_with_threshold(CLICKBAIT, 0.7).await.is_news);
}

#[tokio::test]
async fn article_heuristic_needs_length_and_sentences() {
    let gate = rules_only();
    assert!(gate.is_news_article(WIRE_STORY).await);
    assert!(!gate.is_news_article(CLICKBAIT).await);
}

#[test]
fn headline_heuristic() {
    assert!(is_news_headline("Government expands rural broadband funding"));
    assert!(!is_news_headline("hello there General Kenobi"));
    assert!(!is_news_headline("Too short"));
}
