// src/analyze/labels.rs
//! Classifier label normalization into a closed REAL/FAKE/UNKNOWN space.
//!
//! Raw labels are matched case-insensitively against an explicit table. Positional or
//! argmax order is never used: swapping the model behind the classifier changes what
//! `LABEL_0`/`LABEL_1` mean, and the table is the one place that knowledge lives.

use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ClassifierConfig;
use crate::providers::TextClassifier;
use crate::text::{anon_hash, round_to, truncate_chars};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RawLabel {
    Real,
    Fake,
    Unknown,
}

impl RawLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "REAL",
            Self::Fake => "FAKE",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Closed mapping table: raw model label → bucket.
const LABEL_TABLE: [(&str, RawLabel); 8] = [
    ("REAL", RawLabel::Real),
    ("LABEL_1", RawLabel::Real),
    ("TRUE", RawLabel::Real),
    ("LEGITIMATE", RawLabel::Real),
    ("FAKE", RawLabel::Fake),
    ("LABEL_0", RawLabel::Fake),
    ("FALSE", RawLabel::Fake),
    ("TOXIC", RawLabel::Fake),
];

pub fn map_label(raw: &str) -> Option<RawLabel> {
    let upper = raw.trim().to_uppercase();
    LABEL_TABLE
        .iter()
        .find(|(name, _)| *name == upper)
        .map(|(_, label)| *label)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierVerdict {
    pub label: RawLabel,
    pub confidence: f32,
    /// False when no raw label was found in the mapping table.
    pub mapped: bool,
    pub reason: String,
}

impl ClassifierVerdict {
    pub fn unavailable(reason: impl Into<String>, neutral: f32) -> Self {
        Self {
            label: RawLabel::Unknown,
            confidence: neutral,
            mapped: false,
            reason: reason.into(),
        }
    }
}

pub struct LabelNormalizer {
    cfg: ClassifierConfig,
    classifier: Arc<dyn TextClassifier>,
    call_timeout: Duration,
}

impl LabelNormalizer {
    pub fn new(cfg: ClassifierConfig, classifier: Arc<dyn TextClassifier>, call_timeout: Duration) -> Self {
        Self {
            cfg,
            classifier,
            call_timeout,
        }
    }

    /// UNKNOWN at the configured neutral confidence.
    pub fn timed_out(&self) -> ClassifierVerdict {
        ClassifierVerdict::unavailable("ML classification timed out", self.cfg.neutral_confidence)
    }

    /// Classify (input truncated to `max_input_chars`) and normalize. Never fails:
    /// an unavailable classifier yields UNKNOWN at the neutral confidence.
    pub async fn classify(&self, text: &str) -> ClassifierVerdict {
        let input = truncate_chars(text, self.cfg.max_input_chars);
        let outcome = tokio::time::timeout(self.call_timeout, self.classifier.classify(input)).await;
        let verdict = match outcome {
            Ok(Ok(scores)) => self.normalize(&scores),
            Ok(Err(e)) => {
                warn!(target: "pipeline", service = "classifier", error = %e, "classifier failed, using UNKNOWN");
                counter!("upstream_fallback_total", "service" => "classifier").increment(1);
                ClassifierVerdict::unavailable(format!("ML classification error: {e}"), self.cfg.neutral_confidence)
            }
            Err(_) => {
                warn!(target: "pipeline", service = "classifier", "classifier timed out, using UNKNOWN");
                counter!("upstream_fallback_total", "service" => "classifier").increment(1);
                self.timed_out()
            }
        };
        debug!(
            target: "pipeline",
            id = %anon_hash(text),
            label = verdict.label.as_str(),
            confidence = verdict.confidence,
            mapped = verdict.mapped,
            "classifier verdict"
        );
        verdict
    }

    /// Pure normalization of raw (label, score) output.
    ///
    /// - several labels: sum the scores mapping into each bucket (absent bucket = 0.5),
    ///   the larger bucket wins, ties go to FAKE;
    /// - one label: table lookup, else the fallback score threshold (flagged unmapped);
    /// - nothing usable: UNKNOWN at the neutral confidence.
    pub fn normalize(&self, scores: &[(String, f32)]) -> ClassifierVerdict {
        match scores {
            [] => ClassifierVerdict::unavailable("Classifier returned no labels", self.cfg.neutral_confidence),
            [(label, score)] => self.normalize_single(label, *score),
            many => self.normalize_many(many),
        }
    }

    fn normalize_single(&self, raw: &str, score: f32) -> ClassifierVerdict {
        let score = score.clamp(0.0, 1.0);
        match map_label(raw) {
            Some(label) => verdict(label, score, true),
            None => {
                warn!(target: "pipeline", raw_label = raw, "unmapped classifier label, deciding by score");
                let label = if score > self.cfg.fallback_threshold {
                    RawLabel::Real
                } else {
                    RawLabel::Fake
                };
                verdict(label, score, false)
            }
        }
    }

    fn normalize_many(&self, scores: &[(String, f32)]) -> ClassifierVerdict {
        let mut real: Option<f32> = None;
        let mut fake: Option<f32> = None;
        for (raw, score) in scores {
            match map_label(raw) {
                Some(RawLabel::Real) => *real.get_or_insert(0.0) += score,
                Some(RawLabel::Fake) => *fake.get_or_insert(0.0) += score,
                _ => debug!(target: "pipeline", raw_label = %raw, "ignoring unmapped label in score list"),
            }
        }
        if real.is_none() && fake.is_none() {
            warn!(target: "pipeline", "no classifier label maps to REAL or FAKE");
            return ClassifierVerdict::unavailable("Classifier labels not recognized", self.cfg.neutral_confidence);
        }
        let neutral = self.cfg.neutral_confidence;
        let real = real.unwrap_or(neutral).clamp(0.0, 1.0);
        let fake = fake.unwrap_or(neutral).clamp(0.0, 1.0);
        if real > fake {
            verdict(RawLabel::Real, real, true)
        } else {
            verdict(RawLabel::Fake, fake, true)
        }
    }
}

fn verdict(label: RawLabel, confidence: f32, mapped: bool) -> ClassifierVerdict {
    let confidence = round_to(confidence, 3);
    ClassifierVerdict {
        label,
        confidence,
        mapped,
        reason: format!("ML model prediction with {:.1}% confidence", confidence * 100.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::FixedClassifier;

    fn normalizer() -> LabelNormalizer {
        LabelNormalizer::new(
            ClassifierConfig::default(),
            Arc::new(FixedClassifier::single("REAL", 0.9)),
            Duration::from_secs(1),
        )
    }

    fn s(pairs: &[(&str, f32)]) -> Vec<(String, f32)> {
        pairs.iter().map(|(l, v)| (l.to_string(), *v)).collect()
    }

    #[test]
    fn table_lookup_is_case_insensitive() {
        assert_eq!(map_label("label_1"), Some(RawLabel::Real));
        assert_eq!(map_label(" Toxic "), Some(RawLabel::Fake));
        assert_eq!(map_label("NEUTRAL"), None);
    }

    #[test]
    fn multi_score_uses_buckets_not_position() {
        let n = normalizer();
        let v = n.normalize(&s(&[("LABEL_0", 0.3), ("LABEL_1", 0.7)]));
        assert_eq!(v.label, RawLabel::Real);
        assert!((v.confidence - 0.7).abs() < 1e-6);

        let v = n.normalize(&s(&[("REAL", 0.2), ("FAKE", 0.8)]));
        assert_eq!(v.label, RawLabel::Fake);
    }

    #[test]
    fn missing_bucket_defaults_to_neutral() {
        let v = normalizer().normalize(&s(&[("REAL", 0.4), ("OTHER", 0.6)]));
        // fake bucket absent → 0.5 beats 0.4
        assert_eq!(v.label, RawLabel::Fake);
        assert!((v.confidence - 0.5).abs() < 1e-6);
    }

    #[test]
    fn tie_goes_to_fake() {
        let v = normalizer().normalize(&s(&[("REAL", 0.5), ("FAKE", 0.5)]));
        assert_eq!(v.label, RawLabel::Fake);
    }

    #[test]
    fn unmapped_single_label_is_flagged() {
        let n = normalizer();
        let v = n.normalize(&s(&[("POSITIVE", 0.9)]));
        assert_eq!(v.label, RawLabel::Real);
        assert!(!v.mapped);
        let v = n.normalize(&s(&[("POSITIVE", 0.5)]));
        assert_eq!(v.label, RawLabel::Fake);
    }

    #[test]
    fn nothing_usable_is_unknown() {
        let n = normalizer();
        assert_eq!(n.normalize(&[]).label, RawLabel::Unknown);
        let v = n.normalize(&s(&[("A", 0.1), ("B", 0.9)]));
        assert_eq!(v.label, RawLabel::Unknown);
        assert!((v.confidence - 0.5).abs() < 1e-6);
    }
}
