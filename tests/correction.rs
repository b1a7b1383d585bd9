// tests/correction.rs
use async_trait::async_trait;
use fake_news_analyzer::analyze::correction::{validity, CorrectionEngine, CorrectionRule, FinalLabel};
use fake_news_analyzer::analyze::forensic::{ForensicAnalyzer, ForensicReport};
use fake_news_analyzer::analyze::labels::{ClassifierVerdict, LabelNormalizer, RawLabel};
use fake_news_analyzer::config::ClassifierConfig;
use fake_news_analyzer::error::Result;
use fake_news_analyzer::fact_check::{analyze_claim_novelty, FactCheckVerdict, FactStatus};
use fake_news_analyzer::providers::{FailingProvider, FixedClassifier, TextClassifier};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const CLICKBAIT: &str =
    "SHOCKING!!!! The president said the government is hiding the truth about the city water supply!";
const CLEAN: &str = "According to officials, the vote passed at 10:30 with 55% support.";

fn forensic(text: &str) -> ForensicReport {
    ForensicAnalyzer::default().analyze(text)
}

fn fact(status: FactStatus) -> FactCheckVerdict {
    FactCheckVerdict {
        status,
        confidence: 0.5,
        evidence: None,
        similar_headlines: Vec::new(),
        explanation: String::new(),
        recommendation: String::new(),
        novelty: analyze_claim_novelty("plain claim"),
    }
}

fn classified(label: RawLabel, confidence: f32) -> ClassifierVerdict {
    ClassifierVerdict {
        label,
        confidence,
        mapped: true,
        reason: format!("ML model prediction with {:.1}% confidence", confidence * 100.0),
    }
}

fn engine() -> CorrectionEngine {
    CorrectionEngine::default()
}

#[test]
fn real_with_two_flags_is_overridden() {
    let v = engine().correct(
        &classified(RawLabel::Real, 0.9),
        &forensic(CLICKBAIT),
        &fact(FactStatus::Supported),
    );
    assert_eq!(v.label, FinalLabel::Fake);
    assert!((v.confidence - 0.7).abs() < 1e-6);
    assert_eq!(v.rule, Some(CorrectionRule::RealOverridden));
    assert_eq!(v.red_flag_count, 2);
    assert_eq!(
        v.correction_reason,
        "Originally classified as REAL, but overridden due to 2 red flags: \
         forensic: excessive_exclamations, forensic: clickbait_language"
    );
}

#[test]
fn adverse_fact_check_counts_as_a_flag() {
    let v = engine().correct(
        &classified(RawLabel::Real, 0.9),
        &forensic(CLICKBAIT),
        &fact(FactStatus::NotFound),
    );
    assert_eq!(v.label, FinalLabel::Fake);
    assert_eq!(v.red_flag_count, 3);
    assert!((v.confidence - 0.8).abs() < 1e-6);
    assert!(v.correction_reason.ends_with("fact-check: NOT_FOUND"));
}

#[test]
fn override_confidence_is_capped() {
    let wall = format!("AMAZING SHOCKING NEWS!!!!!! {}", vec!["WORDS"; 60].join(" "));
    let v = engine().correct(
        &classified(RawLabel::Real, 0.99),
        &forensic(&wall),
        &fact(FactStatus::Conflicting),
    );
    // five forensic flags, conflicting fact check, credibility 0.3
    assert_eq!(v.red_flag_count, 7);
    assert!((v.confidence - 0.8).abs() < 1e-6);
    assert!(v.correction_reason.contains("low credibility score: 0.30"));
}

#[test]
fn single_flag_leaves_real_alone() {
    let c = classified(RawLabel::Real, 0.9);
    let v = engine().correct(&c, &forensic(CLEAN), &fact(FactStatus::NotFound));
    assert_eq!(v.label, FinalLabel::Real);
    assert_eq!(v.rule, None);
    assert_eq!(v.red_flag_count, 1);
    assert!((v.confidence - 0.9).abs() < 1e-6);
    assert_eq!(v.correction_reason, c.reason);
}

#[test]
fn fake_with_support_loses_confidence() {
    let v = engine().correct(
        &classified(RawLabel::Fake, 0.9),
        &forensic(CLEAN),
        &fact(FactStatus::Supported),
    );
    assert_eq!(v.label, FinalLabel::Fake);
    assert!((v.confidence - 0.6).abs() < 1e-6);
    assert_eq!(v.rule, Some(CorrectionRule::FakeSupported));
    assert_eq!(
        v.correction_reason,
        "Classified as FAKE but fact-check shows some support (SUPPORTED). Confidence reduced."
    );

    let v = engine().correct(
        &classified(RawLabel::Fake, 0.5),
        &forensic(CLEAN),
        &fact(FactStatus::PartiallySupported),
    );
    assert!((v.confidence - 0.3).abs() < 1e-6);
}

#[test]
fn fake_but_recent_becomes_unverified() {
    let v = engine().correct(
        &classified(RawLabel::Fake, 0.95),
        &forensic(CLEAN),
        &fact(FactStatus::UnverifiedRecent),
    );
    assert_eq!(v.label, FinalLabel::Unverified);
    assert!((v.confidence - 0.4).abs() < 1e-6);
    assert_eq!(v.rule, Some(CorrectionRule::FakeUnverifiedRecent));
    assert_eq!(validity(v.label, FactStatus::UnverifiedRecent), "Unverified - may be recent news");
}

#[test]
fn fake_without_support_and_unknown_pass_through() {
    let v = engine().correct(
        &classified(RawLabel::Fake, 0.77),
        &forensic(CLICKBAIT),
        &fact(FactStatus::NotFound),
    );
    assert_eq!((v.label, v.rule), (FinalLabel::Fake, None));
    assert!((v.confidence - 0.77).abs() < 1e-6);

    let v = engine().correct(
        &ClassifierVerdict::unavailable("ML classification timed out", 0.5),
        &forensic(CLICKBAIT),
        &fact(FactStatus::NotFound),
    );
    assert_eq!(v.label, FinalLabel::Unknown);
    assert_eq!(v.correction_reason, "ML classification timed out");
}

/// Remembers the input it was given.
struct CapturingClassifier {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl TextClassifier for CapturingClassifier {
    async fn classify(&self, text: &str) -> Result<Vec<(String, f32)>> {
        self.seen.lock().unwrap().push(text.to_string());
        Ok(vec![("LABEL_1".to_string(), 0.8), ("LABEL_0".to_string(), 0.2)])
    }
    fn name(&self) -> &'static str {
        "capturing"
    }
}

struct StalledClassifier;

#[async_trait]
impl TextClassifier for StalledClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<(String, f32)>> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(Vec::new())
    }
    fn name(&self) -> &'static str {
        "stalled"
    }
}

#[tokio::test]
async fn classifier_input_is_truncated() {
    let capturing = Arc::new(CapturingClassifier {
        seen: Mutex::new(Vec::new()),
    });
    let n = LabelNormalizer::new(ClassifierConfig::default(), capturing.clone(), Duration::from_secs(1));
    let long = "é".repeat(2_000);
    let v = n.classify(&long).await;
    assert_eq!(v.label, RawLabel::Real);
    assert!((v.confidence - 0.8).abs() < 1e-6);
    assert_eq!(capturing.seen.lock().unwrap()[0].chars().count(), 512);
}

#[tokio::test]
async fn unavailable_classifier_is_unknown() {
    let n = LabelNormalizer::new(
        ClassifierConfig::default(),
        Arc::new(FailingProvider { service: "classifier" }),
        Duration::from_secs(1),
    );
    let v = n.classify("anything").await;
    assert_eq!(v.label, RawLabel::Unknown);
    assert!((v.confidence - 0.5).abs() < 1e-6);
    assert!(!v.mapped);

    let n = LabelNormalizer::new(ClassifierConfig::default(), Arc::new(StalledClassifier), Duration::from_millis(50));
    let v = n.classify("anything").await;
    assert_eq!(v.label, RawLabel::Unknown);
    assert_eq!(v.reason, "ML classification timed out");
}

#[tokio::test]
async fn fixed_classifier_round_trip() {
    let n = LabelNormalizer::new(
        ClassifierConfig::default(),
        Arc::new(FixedClassifier::single("FAKE", 0.93)),
        Duration::from_secs(1),
    );
    let v = n.classify("text").await;
    assert_eq!(v.label, RawLabel::Fake);
    assert_eq!(v.reason, "ML model prediction with 93.0% confidence");
}
