// tests/fact_check.rs
use async_trait::async_trait;
use chrono::Utc;
use fake_news_analyzer::config::FactCheckConfig;
use fake_news_analyzer::error::Result;
use fake_news_analyzer::fact_check::{
    analyze_claim_novelty, FactStatus, FactVerifier, Novelty, ScoredHeadline,
};
use fake_news_analyzer::ingest::cache::SlotStore;
use fake_news_analyzer::ingest::providers::HtmlHeadingFetcher;
use fake_news_analyzer::ingest::types::HeadlineRecord;
use fake_news_analyzer::ingest::HeadlineCache;
use fake_news_analyzer::providers::{Embedder, FailingProvider, MapEmbedder};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn record(text: &str, url: &str, reliability: f32) -> HeadlineRecord {
    HeadlineRecord {
        text: text.to_string(),
        source_url: url.to_string(),
        reliability,
        region: "global".to_string(),
        fetched_at: Utc::now(),
    }
}

fn scored(similarity: f32, reliability: f32) -> ScoredHeadline {
    ScoredHeadline {
        record: record("Government expands rural broadband funding", "https://www.reuters.com", reliability),
        similarity,
    }
}

fn verifier(dir: &std::path::Path, embedder: Arc<dyn Embedder>) -> FactVerifier {
    let cache = HeadlineCache::new(
        SlotStore::new(dir, "trusted_headlines"),
        Arc::new(HtmlHeadingFetcher::from_fixtures(HashMap::new(), 4)),
        Vec::new(),
        Duration::from_secs(7200),
        Duration::from_secs(1),
    );
    FactVerifier::new(FactCheckConfig::default(), Arc::new(cache), embedder, Duration::from_secs(1))
}

fn broadband_embedder() -> Arc<dyn Embedder> {
    Arc::new(
        MapEmbedder::new(vec![0.0, 1.0, 0.0])
            .with("broadband", vec![1.0, 0.0, 0.0])
            .with("volcano", vec![0.6, 0.8, 0.0]),
    )
}

#[test]
fn status_ladder_boundaries_are_strict() {
    let dir = tempfile::tempdir().unwrap();
    let v = verifier(dir.path(), broadband_embedder());
    let standard = analyze_claim_novelty("Officials expand broadband funding");

    // exactly 0.85 similarity is only partial support
    let r = v.classify(vec![scored(0.85, 0.98)], standard.clone());
    assert_eq!(r.status, FactStatus::PartiallySupported);
    assert!((r.confidence - 0.6).abs() < 1e-6);

    // high similarity but reliability not above 0.85
    let r = v.classify(vec![scored(0.95, 0.85)], standard.clone());
    assert_eq!(r.status, FactStatus::PartiallySupported);

    let r = v.classify(vec![scored(0.9, 0.9)], standard.clone());
    assert_eq!(r.status, FactStatus::Supported);
    assert!((r.confidence - 0.81).abs() < 1e-5);
    assert_eq!(r.explanation, "Similar report found in trusted source (90.0% reliable)");

    // confidence is capped
    let r = v.classify(vec![scored(1.0, 0.98)], standard.clone());
    assert!((r.confidence - 0.95).abs() < 1e-6);

    // exactly 0.7 is conflicting
    let r = v.classify(vec![scored(0.7, 0.98)], standard);
    assert_eq!(r.status, FactStatus::Conflicting);
    assert!((r.confidence - 0.4).abs() < 1e-6);
    assert_eq!(r.assessment(), "Conflicting information found");
}

#[test]
fn no_matches_depend_on_novelty() {
    let dir = tempfile::tempdir().unwrap();
    let v = verifier(dir.path(), broadband_embedder());

    let r = v.classify(Vec::new(), analyze_claim_novelty("Breaking: dam fails upstream"));
    assert_eq!(r.status, FactStatus::UnverifiedRecent);
    assert!((r.confidence - 0.3).abs() < 1e-6);
    assert!(r.evidence.is_none());
    assert_eq!(r.recommendation, "Monitor trusted news sources for verification");

    let r = v.classify(Vec::new(), analyze_claim_novelty("Officials deny the dam failed"));
    assert_eq!(r.status, FactStatus::NotFound);
    assert!((r.confidence - 0.8).abs() < 1e-6);
    assert_eq!(r.assessment(), "No verification found");
}

#[test]
fn novelty_detail() {
    let n = analyze_claim_novelty("Latest: storm hits today, more on March 3");
    assert!(n.is_breaking_news);
    assert_eq!(n.breaking_score, 2); // latest, today
    assert!(n.has_recent_date);
    assert_eq!(n.novelty_assessment, Novelty::Recent);

    let n = analyze_claim_novelty("The bridge was built in 1931");
    assert!(!n.is_breaking_news && !n.has_recent_date);
    assert_eq!(n.novelty_assessment, Novelty::Standard);
}

#[tokio::test]
async fn similar_headlines_sorted_by_similarity_then_reliability() {
    let dir = tempfile::tempdir().unwrap();
    let v = verifier(dir.path(), broadband_embedder());
    let headlines = vec![
        record("Broadband plan clears committee vote", "https://www.npr.org", 0.91),
        record("Sports roundup for the weekend games", "https://www.cnn.com", 0.85),
        record("Rural broadband funding gets final approval", "https://www.reuters.com", 0.98),
        record("Volcano erupts near remote island town", "https://www.bbc.com/news", 0.95),
    ];
    let got = v
        .find_similar_headlines("Government expands broadband access", &headlines, 0.7)
        .await
        .unwrap();
    let urls: Vec<&str> = got.iter().map(|s| s.record.source_url.as_str()).collect();
    // both broadband headlines tie at 1.0; volcano scores 0.6 and is dropped
    assert_eq!(urls, vec!["https://www.reuters.com", "https://www.npr.org"]);

    let verdict = v.check_against("Government expands broadband access", &headlines).await;
    assert_eq!(verdict.status, FactStatus::Supported);
    let ev = verdict.evidence.unwrap();
    assert_eq!(ev.matched_headline, "Rural broadband funding gets final approval");
    assert!((ev.source_reliability - 0.98).abs() < 1e-6);
    assert_eq!(verdict.similar_headlines.len(), 2);
}

#[tokio::test]
async fn matches_are_capped() {
    let dir = tempfile::tempdir().unwrap();
    let v = verifier(dir.path(), broadband_embedder());
    let headlines: Vec<HeadlineRecord> = (0..8)
        .map(|i| record(&format!("Broadband story number {i} today"), "https://www.apnews.com", 0.96))
        .collect();
    let got = v
        .find_similar_headlines("broadband expansion", &headlines, 0.7)
        .await
        .unwrap();
    assert_eq!(got.len(), 5);

    let verdict = v.check_against("broadband expansion", &headlines).await;
    assert_eq!(verdict.similar_headlines.len(), 3);
}

#[tokio::test]
async fn failing_embedder_means_no_matches() {
    let dir = tempfile::tempdir().unwrap();
    let v = verifier(dir.path(), Arc::new(FailingProvider { service: "embedder" }));
    let headlines = vec![record("Rural broadband funding approved", "https://www.reuters.com", 0.98)];

    assert!(v
        .find_similar_headlines("broadband funding", &headlines, 0.7)
        .await
        .is_err());
    let verdict = v.check_against("broadband funding", &headlines).await;
    assert_eq!(verdict.status, FactStatus::NotFound);
}

#[tokio::test]
async fn empty_cache_and_no_sources_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let v = verifier(dir.path(), broadband_embedder());
    let verdict = v.comprehensive_fact_check("Officials expand broadband funding").await;
    assert_eq!(verdict.status, FactStatus::NotFound);
    assert!(verdict.similar_headlines.is_empty());
}

/// One embedding at a time, each taking a little while.
struct SlowEmbedder;

#[async_trait]
impl Embedder for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(Duration::from_millis(20)).await;
        if text.to_lowercase().contains("broadband") {
            Ok(vec![1.0, 0.0])
        } else {
            Ok(vec![0.0, 1.0])
        }
    }
    fn name(&self) -> &'static str {
        "slow"
    }
}

#[tokio::test]
async fn many_headlines_fit_within_the_call_timeout() {
    let dir = tempfile::tempdir().unwrap();
    let v = verifier(dir.path(), Arc::new(SlowEmbedder));
    let headlines: Vec<HeadlineRecord> = (0..100)
        .map(|i| record(&format!("Broadband funding update number {i}"), "https://www.reuters.com", 0.98))
        .collect();

    let verdict = v.check_against("Officials expand broadband funding", &headlines).await;
    assert_eq!(verdict.status, FactStatus::Supported);
    assert_eq!(verdict.similar_headlines.len(), 3);
}
