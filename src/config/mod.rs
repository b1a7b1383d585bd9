// src/config/mod.rs
//! Analyzer configuration: every threshold and weight the pipeline depends on, in one place.
//!
//! The scoring heuristics (news probability, credibility) are hand-tuned and uncalibrated.
//! Defaults reproduce the original rules exactly; change them only with evaluation data.
//!
//! Loading order:
//! 1) `$ANALYZER_CONFIG_PATH`, else `config/analyzer.toml` (missing file → defaults)
//! 2) env overrides: `NEWS_THRESHOLD` (clamped to [0,1]), `HEADLINE_CACHE_DIR`

pub mod ai;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::ingest::sources::{default_registry, TrustedSource};

pub const DEFAULT_CONFIG_PATH: &str = "config/analyzer.toml";
pub const ENV_CONFIG_PATH: &str = "ANALYZER_CONFIG_PATH";
pub const ENV_NEWS_THRESHOLD: &str = "NEWS_THRESHOLD";
pub const ENV_CACHE_DIR: &str = "HEADLINE_CACHE_DIR";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub news_gate: NewsGateConfig,
    pub forensic: ForensicConfig,
    pub fact_check: FactCheckConfig,
    pub cache: CacheConfig,
    pub correction: CorrectionConfig,
    pub classifier: ClassifierConfig,
    pub explanation: ExplanationConfig,
    pub timeouts: TimeoutConfig,
    pub providers: ProvidersConfig,
    pub sources: Vec<TrustedSource>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            news_gate: NewsGateConfig::default(),
            forensic: ForensicConfig::default(),
            fact_check: FactCheckConfig::default(),
            cache: CacheConfig::default(),
            correction: CorrectionConfig::default(),
            classifier: ClassifierConfig::default(),
            explanation: ExplanationConfig::default(),
            timeouts: TimeoutConfig::default(),
            providers: ProvidersConfig::default(),
            sources: default_registry(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NewsGateConfig {
    /// Combined score needed to call a text news.
    pub threshold: f32,
    pub rule_weight: f32,
    pub ai_weight: f32,
    /// Score used when the zero-shot classifier is absent or fails.
    pub neutral_ai_score: f32,
    /// Trimmed texts shorter than this (chars) short-circuit to not-news.
    pub min_chars: usize,
}

impl Default for NewsGateConfig {
    fn default() -> Self {
        Self {
            threshold: 0.6,
            rule_weight: 0.7,
            ai_weight: 0.3,
            neutral_ai_score: 0.5,
            min_chars: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForensicConfig {
    pub max_exclamations: usize,
    pub max_uppercase_ratio: f32,
    pub max_avg_sentence_len: f32,
    /// `no_source_attribution` only fires above this word count.
    pub attribution_min_words: usize,
    pub base_credibility: f32,
    pub red_flag_penalty: f32,
    pub citation_bonus: f32,
    pub detail_bonus: f32,
    pub quote_bonus: f32,
    pub high_cutoff: f32,
    pub medium_cutoff: f32,
}

impl Default for ForensicConfig {
    fn default() -> Self {
        Self {
            max_exclamations: 3,
            max_uppercase_ratio: 0.15,
            max_avg_sentence_len: 30.0,
            attribution_min_words: 50,
            base_credibility: 0.8,
            red_flag_penalty: 0.1,
            citation_bonus: 0.1,
            detail_bonus: 0.1,
            quote_bonus: 0.05,
            high_cutoff: 0.7,
            medium_cutoff: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FactCheckConfig {
    pub min_similarity: f32,
    pub max_matches: usize,
    /// Both must be strictly exceeded for SUPPORTED.
    pub supported_similarity: f32,
    pub supported_reliability: f32,
    pub supported_confidence_cap: f32,
    /// Best match must strictly exceed this for PARTIALLY_SUPPORTED.
    pub partial_similarity: f32,
    pub partial_confidence: f32,
    pub conflicting_confidence: f32,
    pub not_found_confidence: f32,
    pub unverified_recent_confidence: f32,
    /// Similar headlines attached as evidence next to the best match.
    pub evidence_similar: usize,
    pub max_per_source: usize,
    /// Headlines shorter than this (words) are dropped at fetch time.
    pub min_headline_words: usize,
}

impl Default for FactCheckConfig {
    fn default() -> Self {
        Self {
            min_similarity: 0.7,
            max_matches: 5,
            supported_similarity: 0.85,
            supported_reliability: 0.85,
            supported_confidence_cap: 0.95,
            partial_similarity: 0.7,
            partial_confidence: 0.6,
            conflicting_confidence: 0.4,
            not_found_confidence: 0.8,
            unverified_recent_confidence: 0.3,
            evidence_similar: 3,
            max_per_source: 50,
            min_headline_words: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub cache_type: String,
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("cache"),
            cache_type: "trusted_headlines".to_string(),
            max_age_secs: 2 * 3600,
        }
    }
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionConfig {
    /// REAL is overridden to FAKE at this many red flags.
    pub override_min_flags: usize,
    pub override_base: f32,
    pub override_per_flag: f32,
    pub override_cap: f32,
    /// Credibility strictly below this counts as one extra red flag.
    pub low_credibility: f32,
    pub support_penalty: f32,
    pub support_floor: f32,
    pub unverified_confidence: f32,
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        Self {
            override_min_flags: 2,
            override_base: 0.5,
            override_per_flag: 0.1,
            override_cap: 0.8,
            low_credibility: 0.5,
            support_penalty: 0.3,
            support_floor: 0.3,
            unverified_confidence: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Model input cap in characters.
    pub max_input_chars: usize,
    /// Score threshold applied to an unmapped single label.
    pub fallback_threshold: f32,
    pub neutral_confidence: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            max_input_chars: 512,
            fallback_threshold: 0.5,
            neutral_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplanationConfig {
    /// Seed for template selection; `None` seeds from the OS.
    pub seed: Option<u64>,
    pub min_completion_chars: Option<usize>,
    pub prompt_chars: Option<usize>,
}

impl ExplanationConfig {
    pub fn min_completion_chars(&self) -> usize {
        self.min_completion_chars.unwrap_or(10)
    }
    pub fn prompt_chars(&self) -> usize {
        self.prompt_chars.unwrap_or(200)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub call_timeout_ms: u64,
    pub fetch_timeout_ms: u64,
    pub pipeline_timeout_ms: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 10_000,
            fetch_timeout_ms: 10_000,
            pipeline_timeout_ms: 30_000,
        }
    }
}

impl TimeoutConfig {
    pub fn call(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
    pub fn fetch(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
    pub fn pipeline(&self) -> Duration {
        Duration::from_millis(self.pipeline_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersConfig {
    /// Inference endpoint; models are addressed as `{base_url}/{model}`.
    pub base_url: String,
    pub classifier_model: String,
    pub embedding_model: String,
    /// Empty string disables the zero-shot step (neutral AI score).
    pub zero_shot_model: String,
    /// `"ENV"` reads `HF_API_TOKEN`.
    pub api_key: String,
    /// Use the offline hashing embedder instead of the remote one.
    pub local_embedder: bool,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api-inference.huggingface.co/models".to_string(),
            classifier_model: "mrm8488/bert-tiny-finetuned-fake-news-detection".to_string(),
            embedding_model: "sentence-transformers/all-MiniLM-L6-v2".to_string(),
            zero_shot_model: "facebook/bart-large-mnli".to_string(),
            api_key: "ENV".to_string(),
            local_embedder: false,
        }
    }
}

impl ProvidersConfig {
    pub fn resolved_api_key(&self) -> String {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            std::env::var("HF_API_TOKEN").unwrap_or_default()
        } else {
            self.api_key.clone()
        }
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_unit_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn unit_or(name: &str, v: &mut f32, default: f32) {
    if !(0.0..=1.0).contains(v) {
        warn!(target: "config", field = name, value = *v, "out of [0,1], using default");
        *v = default;
    }
}

impl AnalyzerConfig {
    /// Resolve the path from env (or default) and load. Missing file → defaults.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
        let mut cfg = if path.exists() {
            Self::load_from_file(&path)?
        } else {
            Self::default()
        };
        cfg.apply_env_overrides();
        Ok(cfg)
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading analyzer config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing analyzer config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        let mut cfg: AnalyzerConfig = toml::from_str(s)?;
        cfg.sanitize()?;
        Ok(cfg)
    }

    pub fn apply_env_overrides(&mut self) {
        if let Some(t) = parse_unit_env(std::env::var(ENV_NEWS_THRESHOLD).ok()) {
            self.news_gate.threshold = t;
        }
        if let Ok(dir) = std::env::var(ENV_CACHE_DIR) {
            if !dir.trim().is_empty() {
                self.cache.dir = PathBuf::from(dir);
            }
        }
    }

    /// Reset out-of-range unit values to defaults; reject configs that cannot work at all.
    fn sanitize(&mut self) -> anyhow::Result<()> {
        let gate = NewsGateConfig::default();
        unit_or("news_gate.threshold", &mut self.news_gate.threshold, gate.threshold);
        unit_or("news_gate.rule_weight", &mut self.news_gate.rule_weight, gate.rule_weight);
        unit_or("news_gate.ai_weight", &mut self.news_gate.ai_weight, gate.ai_weight);
        if self.news_gate.rule_weight + self.news_gate.ai_weight <= 0.0 {
            anyhow::bail!("news_gate.rule_weight + news_gate.ai_weight must be > 0");
        }

        let fc = FactCheckConfig::default();
        unit_or("fact_check.min_similarity", &mut self.fact_check.min_similarity, fc.min_similarity);
        unit_or(
            "fact_check.supported_similarity",
            &mut self.fact_check.supported_similarity,
            fc.supported_similarity,
        );
        unit_or(
            "fact_check.supported_reliability",
            &mut self.fact_check.supported_reliability,
            fc.supported_reliability,
        );

        for src in &mut self.sources {
            if !(0.0..=1.0).contains(&src.reliability) {
                warn!(target: "config", url = %src.url, "source reliability clamped");
                src.reliability = src.reliability.clamp(0.0, 1.0);
            }
        }
        if self.sources.is_empty() {
            warn!(target: "config", "no trusted sources configured; fact checks will find nothing");
        }
        Ok(())
    }
}
