// src/analyze/mod.rs
//! Analysis pipeline entry: gate → {forensic, fact check, classifier} → correction → explanation.
//!
//! Nothing here returns an error. Every collaborator failure degrades to its neutral default,
//! and after the gate the stages share one deadline (`timeouts.pipeline_timeout_ms`).

pub mod ai_adapter;
pub mod correction;
pub mod explain;
pub mod forensic;
pub mod labels;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{info, warn};

use crate::config::ai::AiConfig;
use crate::config::AnalyzerConfig;
use crate::fact_check::{analyze_claim_novelty, FactCheckVerdict, FactVerifier};
use crate::gate::{NewsDetectionResult, NewsGate};
use crate::history::{History, NullSink, VerdictLogEntry, VerdictSink};
use crate::ingest::providers::HtmlHeadingFetcher;
use crate::ingest::types::HeadlineFetcher;
use crate::ingest::HeadlineCache;
use crate::metrics::ensure_metrics_described;
use crate::providers::{Embedder, HashingEmbedder, HfInferenceClient, TextClassifier, ZeroShotClassifier};
use crate::text::{anon_hash, summarize};

// Re-export convenient types.
pub use crate::analyze::ai_adapter::{build_completion_provider, DisabledProvider, DynCompletion, TextCompletionProvider};
pub use crate::analyze::correction::{validity, CorrectedVerdict, CorrectionEngine, FinalLabel, NOT_NEWS};
pub use crate::analyze::explain::{Explanation, ExplanationComposer};
pub use crate::analyze::forensic::{ForensicAnalyzer, ForensicReport, RedFlag};
pub use crate::analyze::labels::{ClassifierVerdict, LabelNormalizer, RawLabel};

const INPUT_SUMMARY_CHARS: usize = 300;
const HISTORY_CAPACITY: usize = 1_000;

/// Everything `analyze` produces. Post-gate sections are absent for non-news input.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisRecord {
    pub input_summary: String,
    pub is_news: bool,
    pub validity: String,
    /// Gate reason when the text was not considered news.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub news_detection: NewsDetectionResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_check: Option<FactCheckVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forensic: Option<ForensicReport>,
    /// Normalized classifier output before correction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifier: Option<ClassifierVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<CorrectedVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explanation: Option<Explanation>,
    pub analyzed_at: DateTime<Utc>,
}

/// Injected collaborators. Tests substitute deterministic fakes for each.
pub struct Services {
    pub classifier: Arc<dyn TextClassifier>,
    pub embedder: Arc<dyn Embedder>,
    pub zero_shot: Option<Arc<dyn ZeroShotClassifier>>,
    pub headline_fetcher: Arc<dyn HeadlineFetcher>,
    pub completion: DynCompletion,
    pub sink: Arc<dyn VerdictSink>,
}

impl Services {
    /// No zero-shot, no completion, verdicts discarded.
    pub fn new(
        classifier: Arc<dyn TextClassifier>,
        embedder: Arc<dyn Embedder>,
        headline_fetcher: Arc<dyn HeadlineFetcher>,
    ) -> Self {
        Self {
            classifier,
            embedder,
            zero_shot: None,
            headline_fetcher,
            completion: Arc::new(DisabledProvider),
            sink: Arc::new(NullSink),
        }
    }

    pub fn with_zero_shot(mut self, zs: Arc<dyn ZeroShotClassifier>) -> Self {
        self.zero_shot = Some(zs);
        self
    }

    pub fn with_completion(mut self, c: DynCompletion) -> Self {
        self.completion = c;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn VerdictSink>) -> Self {
        self.sink = sink;
        self
    }
}

pub struct Analyzer {
    gate: NewsGate,
    forensic: ForensicAnalyzer,
    verifier: FactVerifier,
    labels: LabelNormalizer,
    correction: CorrectionEngine,
    explainer: ExplanationComposer,
    sink: Arc<dyn VerdictSink>,
    pipeline_timeout: Duration,
}

impl Analyzer {
    pub fn new(cfg: &AnalyzerConfig, services: Services) -> Self {
        let call = cfg.timeouts.call();
        let headlines = Arc::new(HeadlineCache::from_config(cfg, services.headline_fetcher));
        Self {
            gate: NewsGate::new(cfg.news_gate.clone(), services.zero_shot, call),
            forensic: ForensicAnalyzer::new(cfg.forensic.clone()),
            verifier: FactVerifier::new(cfg.fact_check.clone(), headlines, services.embedder, call),
            labels: LabelNormalizer::new(cfg.classifier.clone(), services.classifier, call),
            correction: CorrectionEngine::new(cfg.correction.clone()),
            explainer: ExplanationComposer::new(cfg.explanation.clone(), services.completion),
            sink: services.sink,
            pipeline_timeout: cfg.timeouts.pipeline(),
        }
    }

    /// Production wiring: hosted inference, live headline fetch, optional completions,
    /// in-memory verdict history.
    pub fn from_config(cfg: &AnalyzerConfig, ai: &AiConfig) -> anyhow::Result<Self> {
        let call = cfg.timeouts.call();
        let hf = Arc::new(HfInferenceClient::new(&cfg.providers, call)?);
        let embedder: Arc<dyn Embedder> = if cfg.providers.local_embedder {
            Arc::new(HashingEmbedder::default())
        } else {
            hf.clone()
        };
        let fetcher = Arc::new(HtmlHeadingFetcher::http(
            cfg.timeouts.fetch(),
            cfg.fact_check.min_headline_words,
        )?);
        let completion = build_completion_provider(ai, &cfg.cache.dir.join("ai"));
        info!(target: "pipeline", provider = completion.provider_name(), "completion provider selected");

        let mut services = Services::new(hf.clone(), embedder, fetcher)
            .with_completion(completion)
            .with_sink(Arc::new(History::with_capacity(HISTORY_CAPACITY)));
        if hf.has_zero_shot() {
            services = services.with_zero_shot(hf);
        }
        Ok(Self::new(cfg, services))
    }

    pub fn gate(&self) -> &NewsGate {
        &self.gate
    }

    pub fn verifier(&self) -> &FactVerifier {
        &self.verifier
    }

    /// Full pipeline. Always returns a structurally complete record.
    pub async fn analyze(&self, text: &str, include_explanations: bool) -> AnalysisRecord {
        ensure_metrics_described();
        counter!("analysis_requests_total").increment(1);
        let t0 = std::time::Instant::now();
        let id = anon_hash(text);

        let detection = self.gate.detect_news(text).await;
        if !detection.is_news {
            counter!("analysis_not_news_total").increment(1);
            info!(target: "pipeline", id = %id, reason = %detection.reason, "not news");
            return AnalysisRecord {
                input_summary: summarize(text, INPUT_SUMMARY_CHARS),
                is_news: false,
                validity: NOT_NEWS.to_string(),
                message: Some(detection.reason.clone()),
                news_detection: detection,
                fact_check: None,
                forensic: None,
                classifier: None,
                verdict: None,
                explanation: None,
                analyzed_at: Utc::now(),
            };
        }

        let deadline = Instant::now() + self.pipeline_timeout;
        let forensic = self.forensic.analyze(text);

        let (fact, classifier) = tokio::join!(
            timeout_at(deadline, self.verifier.comprehensive_fact_check(text)),
            timeout_at(deadline, self.labels.classify(text)),
        );
        let fact = fact.unwrap_or_else(|_| {
            warn!(target: "pipeline", id = %id, service = "fact_check", "pipeline deadline hit, treating as no matches");
            counter!("upstream_fallback_total", "service" => "fact_check").increment(1);
            self.verifier.classify(Vec::new(), analyze_claim_novelty(text))
        });
        let classifier = classifier.unwrap_or_else(|_| {
            warn!(target: "pipeline", id = %id, service = "classifier", "pipeline deadline hit, using UNKNOWN");
            counter!("upstream_fallback_total", "service" => "classifier").increment(1);
            self.labels.timed_out()
        });

        let verdict = self.correction.correct(&classifier, &forensic, &fact);
        let validity = validity(verdict.label, fact.status).to_string();

        let explanation = if include_explanations {
            let composed = timeout_at(deadline, self.explainer.compose(text, &verdict, &forensic, &fact)).await;
            Some(match composed {
                Ok(e) => e,
                Err(_) => {
                    warn!(target: "pipeline", id = %id, service = "completion", "pipeline deadline hit, using templates");
                    counter!("upstream_fallback_total", "service" => "completion").increment(1);
                    self.explainer
                        .compose_templates_only(text, &verdict, &forensic, &fact)
                        .await
                }
            })
        } else {
            None
        };

        self.sink.record(VerdictLogEntry {
            timestamp: Utc::now(),
            text: text.to_string(),
            classifier_label: classifier.label,
            verdict: verdict.clone(),
            fact_status: fact.status,
        });

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("analysis_ms").record(ms);
        info!(
            target: "pipeline",
            id = %id,
            label = verdict.label.as_str(),
            confidence = verdict.confidence,
            fact_status = fact.status.as_str(),
            red_flags = verdict.red_flag_count,
            ms,
            "analysis complete"
        );

        AnalysisRecord {
            input_summary: summarize(text, INPUT_SUMMARY_CHARS),
            is_news: true,
            validity,
            message: None,
            news_detection: detection,
            fact_check: Some(fact),
            forensic: Some(forensic),
            classifier: Some(classifier),
            verdict: Some(verdict),
            explanation,
            analyzed_at: Utc::now(),
        }
    }

    /// Gate + classifier only: `"Not news"` or the normalized label.
    pub async fn quick_classify(&self, text: &str) -> &'static str {
        ensure_metrics_described();
        counter!("analysis_requests_total").increment(1);
        if !self.gate.detect_news(text).await.is_news {
            counter!("analysis_not_news_total").increment(1);
            return NOT_NEWS;
        }
        self.labels.classify(text).await.label.as_str()
    }
}

/// Convenience for callers holding paths rather than parsed configs.
pub fn load_analyzer(config_path: Option<&Path>, ai_path: &Path) -> anyhow::Result<Analyzer> {
    let cfg = match config_path {
        Some(p) => {
            let mut cfg = AnalyzerConfig::load_from_file(p)?;
            cfg.apply_env_overrides();
            cfg
        }
        None => AnalyzerConfig::load()?,
    };
    let ai = AiConfig::load_or_disabled(ai_path);
    Analyzer::from_config(&cfg, &ai)
}
