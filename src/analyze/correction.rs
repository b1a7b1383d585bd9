// src/analyze/correction.rs
//! Hybrid correction: reconcile the classifier verdict with forensic and fact-check signals.
//!
//! red_flag_count = |forensic red flags| + [fact NOT_FOUND/CONFLICTING] + [credibility < 0.5]
//!
//! Rules, first match wins:
//! 1) REAL with >= 2 red flags           → FAKE, min(0.8, 0.5 + 0.1 * count)
//! 2) FAKE with (partial) support        → FAKE, max(0.3, original - 0.3)
//! 3) FAKE with UNVERIFIED_RECENT        → UNVERIFIED, 0.4
//! 4) otherwise                          → unchanged

use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::analyze::forensic::ForensicReport;
use crate::analyze::labels::{ClassifierVerdict, RawLabel};
use crate::config::CorrectionConfig;
use crate::fact_check::{FactCheckVerdict, FactStatus};
use crate::text::round_to;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinalLabel {
    Real,
    Fake,
    Unverified,
    Unknown,
}

impl FinalLabel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Real => "REAL",
            Self::Fake => "FAKE",
            Self::Unverified => "UNVERIFIED",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl From<RawLabel> for FinalLabel {
    fn from(l: RawLabel) -> Self {
        match l {
            RawLabel::Real => Self::Real,
            RawLabel::Fake => Self::Fake,
            RawLabel::Unknown => Self::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionRule {
    RealOverridden,
    FakeSupported,
    FakeUnverifiedRecent,
}

impl CorrectionRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RealOverridden => "real_overridden",
            Self::FakeSupported => "fake_supported",
            Self::FakeUnverifiedRecent => "fake_unverified_recent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedVerdict {
    pub label: FinalLabel,
    pub confidence: f32,
    pub correction_reason: String,
    /// `None` when the classifier verdict passed through unchanged.
    pub rule: Option<CorrectionRule>,
    pub red_flag_count: usize,
}

/// Contributing red flags with their human-readable tags, in a stable order.
pub fn red_flag_details(forensic: &ForensicReport, fact: &FactCheckVerdict, cfg: &CorrectionConfig) -> Vec<String> {
    let mut details: Vec<String> = forensic
        .red_flags()
        .iter()
        .map(|f| format!("forensic: {}", f.code()))
        .collect();
    if fact.status.is_adverse() {
        details.push(format!("fact-check: {}", fact.status.as_str()));
    }
    let cred = forensic.credibility_score();
    if cred < cfg.low_credibility {
        details.push(format!("low credibility score: {cred:.2}"));
    }
    details
}

#[derive(Debug, Clone, Default)]
pub struct CorrectionEngine {
    cfg: CorrectionConfig,
}

impl CorrectionEngine {
    pub fn new(cfg: CorrectionConfig) -> Self {
        Self { cfg }
    }

    pub fn correct(
        &self,
        classifier: &ClassifierVerdict,
        forensic: &ForensicReport,
        fact: &FactCheckVerdict,
    ) -> CorrectedVerdict {
        let cfg = &self.cfg;
        let details = red_flag_details(forensic, fact, cfg);
        let count = details.len();

        let corrected = match (classifier.label, fact.status) {
            (RawLabel::Real, _) if count >= cfg.override_min_flags => CorrectedVerdict {
                label: FinalLabel::Fake,
                confidence: cfg
                    .override_cap
                    .min(cfg.override_base + cfg.override_per_flag * count as f32),
                correction_reason: format!(
                    "Originally classified as REAL, but overridden due to {count} red flags: {}",
                    details.join(", ")
                ),
                rule: Some(CorrectionRule::RealOverridden),
                red_flag_count: count,
            },
            (RawLabel::Fake, status) if status.is_supportive() => CorrectedVerdict {
                label: FinalLabel::Fake,
                confidence: (classifier.confidence - cfg.support_penalty).max(cfg.support_floor),
                correction_reason: format!(
                    "Classified as FAKE but fact-check shows some support ({}). Confidence reduced.",
                    status.as_str()
                ),
                rule: Some(CorrectionRule::FakeSupported),
                red_flag_count: count,
            },
            (RawLabel::Fake, FactStatus::UnverifiedRecent) => CorrectedVerdict {
                label: FinalLabel::Unverified,
                confidence: cfg.unverified_confidence,
                correction_reason:
                    "Classified as FAKE but may be recent news not yet verified by trusted sources".to_string(),
                rule: Some(CorrectionRule::FakeUnverifiedRecent),
                red_flag_count: count,
            },
            _ => CorrectedVerdict {
                label: classifier.label.into(),
                confidence: classifier.confidence,
                correction_reason: classifier.reason.clone(),
                rule: None,
                red_flag_count: count,
            },
        };

        let corrected = CorrectedVerdict {
            confidence: round_to(corrected.confidence.clamp(0.0, 1.0), 3),
            ..corrected
        };

        if let Some(rule) = corrected.rule {
            counter!("correction_applied_total", "rule" => rule.as_str()).increment(1);
            info!(
                target: "correction",
                rule = rule.as_str(),
                from = classifier.label.as_str(),
                to = corrected.label.as_str(),
                red_flags = count,
                confidence = corrected.confidence,
                "classifier verdict corrected"
            );
        }
        corrected
    }
}

/// Overall validity sentence from the corrected label and the fact status.
pub fn validity(label: FinalLabel, fact: FactStatus) -> &'static str {
    match label {
        FinalLabel::Fake if fact.is_supportive() => "Conflicting evidence - requires further verification",
        FinalLabel::Fake => "Fake news",
        FinalLabel::Real => match fact {
            FactStatus::Supported => "Valid news",
            FactStatus::PartiallySupported | FactStatus::UnverifiedRecent => "Likely valid but unverified",
            _ => "Questionable validity",
        },
        FinalLabel::Unverified => "Unverified - may be recent news",
        FinalLabel::Unknown => "Unknown validity",
    }
}

pub const NOT_NEWS: &str = "Not news";
