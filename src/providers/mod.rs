// src/providers/mod.rs
//! Pluggable model collaborators: text classifier, embedder, zero-shot scorer.
//!
//! Every stage takes these as `Arc<dyn ...>` so tests can substitute deterministic fakes.
//! Failures come back as `AnalyzerError::UpstreamUnavailable`; callers degrade, never abort.

pub mod hf_inference;
pub mod local;

use async_trait::async_trait;

use crate::error::Result;

/// `classify(text)` → one or more (label, score) pairs, in whatever label space the model uses.
#[async_trait]
pub trait TextClassifier: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<(String, f32)>>;
    fn name(&self) -> &'static str;
}

/// `embed(text)` → fixed-size vector; only ever compared via cosine similarity.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Default: one call per text, in order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for t in texts {
            out.push(self.embed(t).await?);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str;
}

/// `score(text, labels)` → one score per candidate label.
#[async_trait]
pub trait ZeroShotClassifier: Send + Sync {
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<(String, f32)>>;
}

pub use hf_inference::HfInferenceClient;
pub use local::{FailingProvider, FixedClassifier, FixedZeroShot, HashingEmbedder, MapEmbedder};
