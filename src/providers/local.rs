// src/providers/local.rs
//! Offline providers: a hashing embedder usable without network access, plus
//! deterministic fakes for tests and local runs.

use async_trait::async_trait;
use sha2::{Digest, Sha256};

use super::{Embedder, TextClassifier, ZeroShotClassifier};
use crate::error::{AnalyzerError, Result};

/// Bag-of-words feature hashing into a fixed number of buckets, L2-normalized.
/// Crude, but cosine over it tracks lexical overlap, which is enough offline.
/// Buckets come from SHA-256, so vectors are stable across builds and platforms.
pub struct HashingEmbedder {
    dim: usize,
}

impl HashingEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(8) }
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.len() > 1)
        {
            let idx = bucket(&token.to_lowercase(), self.dim);
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        v
    }
}

fn bucket(token: &str, dim: usize) -> usize {
    let digest = Sha256::digest(token.as_bytes());
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(head) % dim as u64) as usize
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_sync(text))
    }
    fn name(&self) -> &'static str {
        "hashing"
    }
}

/// Embeds by the first rule whose keyword occurs (case-insensitive) in the text.
pub struct MapEmbedder {
    rules: Vec<(String, Vec<f32>)>,
    fallback: Vec<f32>,
}

impl MapEmbedder {
    pub fn new(fallback: Vec<f32>) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    pub fn with(mut self, keyword: &str, vector: Vec<f32>) -> Self {
        self.rules.push((keyword.to_lowercase(), vector));
        self
    }
}

#[async_trait]
impl Embedder for MapEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let lower = text.to_lowercase();
        Ok(self
            .rules
            .iter()
            .find(|(kw, _)| lower.contains(kw.as_str()))
            .map(|(_, v)| v.clone())
            .unwrap_or_else(|| self.fallback.clone()))
    }
    fn name(&self) -> &'static str {
        "map"
    }
}

/// Always returns the same (label, score) list.
#[derive(Clone)]
pub struct FixedClassifier {
    pub scores: Vec<(String, f32)>,
}

impl FixedClassifier {
    pub fn single(label: &str, score: f32) -> Self {
        Self {
            scores: vec![(label.to_string(), score)],
        }
    }
}

#[async_trait]
impl TextClassifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> Result<Vec<(String, f32)>> {
        Ok(self.scores.clone())
    }
    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Puts `news_mass` on the first candidate label and the rest on the last one.
pub struct FixedZeroShot {
    pub news_mass: f32,
}

#[async_trait]
impl ZeroShotClassifier for FixedZeroShot {
    async fn score(&self, _text: &str, labels: &[&str]) -> Result<Vec<(String, f32)>> {
        let n = labels.len();
        Ok(labels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                let s = if i == 0 {
                    self.news_mass
                } else if i + 1 == n {
                    1.0 - self.news_mass
                } else {
                    0.0
                };
                (l.to_string(), s)
            })
            .collect())
    }
}

/// Every call fails as an unavailable upstream.
pub struct FailingProvider {
    pub service: &'static str,
}

#[async_trait]
impl TextClassifier for FailingProvider {
    async fn classify(&self, _text: &str) -> Result<Vec<(String, f32)>> {
        Err(AnalyzerError::upstream(self.service, "unreachable"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

#[async_trait]
impl Embedder for FailingProvider {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(AnalyzerError::upstream(self.service, "unreachable"))
    }
    fn name(&self) -> &'static str {
        "failing"
    }
}

#[async_trait]
impl ZeroShotClassifier for FailingProvider {
    async fn score(&self, _text: &str, _labels: &[&str]) -> Result<Vec<(String, f32)>> {
        Err(AnalyzerError::upstream(self.service, "unreachable"))
    }
}
