// src/fact_check.rs
//! Fact verification: semantic matching of a claim against cached trusted headlines.
//!
//! Status ladder (first match wins):
//! 1) no matches, recent claim      → UNVERIFIED_RECENT (0.3)
//! 2) no matches                    → NOT_FOUND (0.8)
//! 3) sim > 0.85 AND reliability > 0.85 → SUPPORTED (min(sim*rel, 0.95))
//! 4) sim > 0.7                     → PARTIALLY_SUPPORTED (0.6)
//! 5) otherwise                     → CONFLICTING (0.4)
//!
//! Comparisons in 3) and 4) are strict: a best match at exactly 0.85 is only partial support.

use futures::stream::{self, StreamExt, TryStreamExt};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::FactCheckConfig;
use crate::error::{AnalyzerError, Result};
use crate::ingest::types::HeadlineRecord;
use crate::ingest::HeadlineCache;
use crate::providers::Embedder;
use crate::similarity::cosine;
use crate::text::{anon_hash, count_hits};

const SERVICE: &str = "embedder";

/// Headlines per embedding request.
const EMBED_CHUNK: usize = 16;
/// Embedding requests in flight at once.
const EMBED_CONCURRENCY: usize = 8;

pub const RECENT_MARKERS: [&str; 9] = [
    "breaking",
    "just",
    "today",
    "yesterday",
    "this morning",
    "minutes ago",
    "hours ago",
    "latest",
    "developing",
];

static RECENT_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\b(today|yesterday)\b",
        r"\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+\d{1,2}\b",
        r"\b202[0-9]\b",
        r"\b\d{1,2}/\d{1,2}/202[0-9]\b",
    ]
    .iter()
    .filter_map(|p| Regex::new(p).ok())
    .collect()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FactStatus {
    Supported,
    PartiallySupported,
    UnverifiedRecent,
    NotFound,
    Conflicting,
}

impl FactStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Supported => "SUPPORTED",
            Self::PartiallySupported => "PARTIALLY_SUPPORTED",
            Self::UnverifiedRecent => "UNVERIFIED_RECENT",
            Self::NotFound => "NOT_FOUND",
            Self::Conflicting => "CONFLICTING",
        }
    }

    /// Statuses that count against a claim in the correction rules.
    pub fn is_adverse(self) -> bool {
        matches!(self, Self::NotFound | Self::Conflicting)
    }

    pub fn is_supportive(self) -> bool {
        matches!(self, Self::Supported | Self::PartiallySupported)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Novelty {
    Recent,
    Standard,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoveltyReport {
    pub is_breaking_news: bool,
    /// Number of distinct recency markers present.
    pub breaking_score: usize,
    pub has_recent_date: bool,
    pub novelty_assessment: Novelty,
}

impl NoveltyReport {
    pub fn is_recent(&self) -> bool {
        self.novelty_assessment == Novelty::Recent
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredHeadline {
    #[serde(flatten)]
    pub record: HeadlineRecord,
    pub similarity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub matched_headline: String,
    pub source_url: String,
    pub similarity: f32,
    pub source_reliability: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactCheckVerdict {
    pub status: FactStatus,
    pub confidence: f32,
    pub evidence: Option<Evidence>,
    /// Up to `evidence_similar` matches, best first. Empty when there is no evidence.
    pub similar_headlines: Vec<ScoredHeadline>,
    pub explanation: String,
    pub recommendation: String,
    pub novelty: NoveltyReport,
}

impl FactCheckVerdict {
    /// One-line verdict for display.
    pub fn assessment(&self) -> &'static str {
        match self.status {
            FactStatus::Supported => "Valid news",
            FactStatus::PartiallySupported | FactStatus::UnverifiedRecent => {
                "Potentially valid but unverified"
            }
            FactStatus::Conflicting => "Conflicting information found",
            FactStatus::NotFound => "No verification found",
        }
    }
}

pub fn analyze_claim_novelty(claim: &str) -> NoveltyReport {
    let lower = claim.to_lowercase();
    let breaking_score = count_hits(&lower, &RECENT_MARKERS);
    let has_recent_date = RECENT_DATE_PATTERNS.iter().any(|re| re.is_match(&lower));
    NoveltyReport {
        is_breaking_news: breaking_score > 0,
        breaking_score,
        has_recent_date,
        novelty_assessment: if breaking_score > 0 || has_recent_date {
            Novelty::Recent
        } else {
            Novelty::Standard
        },
    }
}

pub struct FactVerifier {
    cfg: FactCheckConfig,
    headlines: Arc<HeadlineCache>,
    embedder: Arc<dyn Embedder>,
    call_timeout: Duration,
}

impl FactVerifier {
    pub fn new(
        cfg: FactCheckConfig,
        headlines: Arc<HeadlineCache>,
        embedder: Arc<dyn Embedder>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            cfg,
            headlines,
            embedder,
            call_timeout,
        }
    }

    pub fn config(&self) -> &FactCheckConfig {
        &self.cfg
    }

    /// Headlines scoring at least `min_similarity`, by (similarity desc, reliability desc),
    /// capped at `max_matches`.
    pub async fn find_similar_headlines(
        &self,
        claim: &str,
        headlines: &[HeadlineRecord],
        min_similarity: f32,
    ) -> Result<Vec<ScoredHeadline>> {
        if headlines.is_empty() {
            return Ok(Vec::new());
        }
        let claim_vec = self.embed_bounded(self.embedder.embed(claim)).await?;
        let texts: Vec<String> = headlines.iter().map(|h| h.text.clone()).collect();
        let vectors = self.embed_headlines(&texts).await?;
        if vectors.len() != headlines.len() {
            return Err(AnalyzerError::upstream(SERVICE, "embedding count mismatch"));
        }

        let mut scored: Vec<ScoredHeadline> = headlines
            .iter()
            .zip(vectors.iter())
            .map(|(h, v)| ScoredHeadline {
                record: h.clone(),
                similarity: cosine(&claim_vec, v),
            })
            .filter(|s| s.similarity >= min_similarity)
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then(
                    b.record
                        .reliability
                        .partial_cmp(&a.record.reliability)
                        .unwrap_or(Ordering::Equal),
                )
        });
        scored.truncate(self.cfg.max_matches);
        Ok(scored)
    }

    /// Fetch (or reuse) trusted headlines and classify the claim against them. Never fails.
    pub async fn comprehensive_fact_check(&self, claim: &str) -> FactCheckVerdict {
        let headlines = self
            .headlines
            .fetch_trusted_headlines(self.cfg.max_per_source)
            .await;
        self.check_against(claim, &headlines).await
    }

    /// Classify `claim` against an already-fetched headline list.
    pub async fn check_against(&self, claim: &str, headlines: &[HeadlineRecord]) -> FactCheckVerdict {
        let novelty = analyze_claim_novelty(claim);
        let similar = match self
            .find_similar_headlines(claim, headlines, self.cfg.min_similarity)
            .await
        {
            Ok(v) => v,
            Err(e) => {
                warn!(target: "fact_check", service = e.service(), error = %e, "similarity search failed, treating as no matches");
                counter!("upstream_fallback_total", "service" => SERVICE).increment(1);
                Vec::new()
            }
        };
        let verdict = self.classify(similar, novelty);
        debug!(
            target: "fact_check",
            id = %anon_hash(claim),
            candidates = headlines.len(),
            status = verdict.status.as_str(),
            confidence = verdict.confidence,
            "fact check classified"
        );
        verdict
    }

    /// Pure status ladder over sorted matches.
    pub fn classify(&self, similar: Vec<ScoredHeadline>, novelty: NoveltyReport) -> FactCheckVerdict {
        let cfg = &self.cfg;
        let Some(best) = similar.first() else {
            let (status, confidence, explanation, recommendation) = if novelty.is_recent() {
                (
                    FactStatus::UnverifiedRecent,
                    cfg.unverified_recent_confidence,
                    "This appears to be recent/breaking news that may not yet be verified by trusted sources",
                    "Monitor trusted news sources for verification",
                )
            } else {
                (
                    FactStatus::NotFound,
                    cfg.not_found_confidence,
                    "No similar reports found in trusted news sources",
                    "Be cautious as this claim lacks mainstream news coverage",
                )
            };
            return FactCheckVerdict {
                status,
                confidence,
                evidence: None,
                similar_headlines: Vec::new(),
                explanation: explanation.to_string(),
                recommendation: recommendation.to_string(),
                novelty,
            };
        };

        let sim = best.similarity;
        let rel = best.record.reliability;
        let (status, confidence, explanation, recommendation) =
            if sim > cfg.supported_similarity && rel > cfg.supported_reliability {
                (
                    FactStatus::Supported,
                    (sim * rel).min(cfg.supported_confidence_cap),
                    format!("Similar report found in trusted source ({:.1}% reliable)", rel * 100.0),
                    "This claim appears to be supported by trusted news reporting",
                )
            } else if sim > cfg.partial_similarity {
                (
                    FactStatus::PartiallySupported,
                    cfg.partial_confidence,
                    "Similar but not identical reports found in trusted sources".to_string(),
                    "This claim has some support but may contain inaccuracies",
                )
            } else {
                (
                    FactStatus::Conflicting,
                    cfg.conflicting_confidence,
                    "Found related but different reports in trusted sources".to_string(),
                    "This claim may be misleading or misrepresented",
                )
            };

        let evidence = Evidence {
            matched_headline: best.record.text.clone(),
            source_url: best.record.source_url.clone(),
            similarity: sim,
            source_reliability: rel,
        };
        let mut similar_headlines = similar;
        similar_headlines.truncate(cfg.evidence_similar);

        FactCheckVerdict {
            status,
            confidence: confidence.clamp(0.0, 1.0),
            evidence: Some(evidence),
            similar_headlines,
            explanation,
            recommendation: recommendation.to_string(),
            novelty,
        }
    }

    /// Chunked and concurrent; each chunk gets its own call timeout. Order is preserved.
    async fn embed_headlines(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let chunks: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(EMBED_CHUNK))
            .map(|chunk| self.embed_bounded(self.embedder.embed_batch(chunk)))
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await?;
        Ok(chunks.into_iter().flatten().collect())
    }

    async fn embed_bounded<T>(&self, fut: impl std::future::Future<Output = Result<T>>) -> Result<T> {
        tokio::time::timeout(self.call_timeout, fut)
            .await
            .map_err(|_| AnalyzerError::Timeout {
                service: SERVICE,
                ms: self.call_timeout.as_millis() as u64,
            })?
    }
}
