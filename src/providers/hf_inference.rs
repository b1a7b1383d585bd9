// src/providers/hf_inference.rs
//! Hosted inference client. Models are addressed as `{base_url}/{model}`; the same client
//! serves classification, feature extraction and zero-shot requests.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::{Embedder, TextClassifier, ZeroShotClassifier};
use crate::config::ProvidersConfig;
use crate::error::{AnalyzerError, Result};

const SERVICE_CLASSIFIER: &str = "classifier";
const SERVICE_EMBEDDER: &str = "embedder";
const SERVICE_ZERO_SHOT: &str = "zero_shot";

pub struct HfInferenceClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    classifier_model: String,
    embedding_model: String,
    zero_shot_model: String,
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f32,
}

/// Classification responses come back nested for batched inputs and flat otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ClassifyResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
}

/// Sentence models return one vector; token models return one vector per token.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Sentence(Vec<f32>),
    Tokens(Vec<Vec<f32>>),
    Batched(Vec<Vec<Vec<f32>>>),
}

#[derive(Debug, Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f32>,
}

#[derive(Serialize)]
struct Inputs<'a> {
    inputs: &'a str,
}

#[derive(Serialize)]
struct BatchInputs<'a> {
    inputs: &'a [String],
}

#[derive(Serialize)]
struct ZeroShotParams<'a> {
    candidate_labels: &'a [&'a str],
}

#[derive(Serialize)]
struct ZeroShotReq<'a> {
    inputs: &'a str,
    parameters: ZeroShotParams<'a>,
}

impl HfInferenceClient {
    pub fn new(cfg: &ProvidersConfig, call_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("fake-news-analyzer/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(call_timeout)
            .build()
            .map_err(|e| AnalyzerError::Config(format!("http client: {e}")))?;
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.resolved_api_key(),
            classifier_model: cfg.classifier_model.clone(),
            embedding_model: cfg.embedding_model.clone(),
            zero_shot_model: cfg.zero_shot_model.clone(),
        })
    }

    pub fn has_zero_shot(&self) -> bool {
        !self.zero_shot_model.trim().is_empty()
    }

    async fn post<B, R>(&self, service: &'static str, model: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{}", self.base_url, model);
        let mut req = self.http.post(&url).json(body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AnalyzerError::upstream(service, format!("HTTP {status}")));
        }
        let parsed = resp
            .json::<R>()
            .await
            .map_err(|e| AnalyzerError::upstream(service, format!("bad response body: {e}")))?;
        debug!(target: "providers", service, model, "inference call ok");
        Ok(parsed)
    }
}

#[async_trait]
impl TextClassifier for HfInferenceClient {
    async fn classify(&self, text: &str) -> Result<Vec<(String, f32)>> {
        let resp: ClassifyResponse = self
            .post(SERVICE_CLASSIFIER, &self.classifier_model, &Inputs { inputs: text })
            .await?;
        let scores = match resp {
            ClassifyResponse::Nested(mut v) => v.drain(..).next().unwrap_or_default(),
            ClassifyResponse::Flat(v) => v,
        };
        if scores.is_empty() {
            return Err(AnalyzerError::upstream(SERVICE_CLASSIFIER, "empty label list"));
        }
        Ok(scores.into_iter().map(|ls| (ls.label, ls.score)).collect())
    }

    fn name(&self) -> &'static str {
        "hf-inference"
    }
}

#[async_trait]
impl Embedder for HfInferenceClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let resp: EmbedResponse = self
            .post(SERVICE_EMBEDDER, &self.embedding_model, &Inputs { inputs: text })
            .await?;
        let v = match resp {
            EmbedResponse::Sentence(v) => v,
            EmbedResponse::Tokens(tokens) => mean_pool(&tokens),
            EmbedResponse::Batched(mut b) => b.drain(..).next().map(|t| mean_pool(&t)).unwrap_or_default(),
        };
        if v.is_empty() {
            return Err(AnalyzerError::upstream(SERVICE_EMBEDDER, "empty embedding"));
        }
        Ok(v)
    }

    /// One request for the whole slice.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let resp: EmbedResponse = self
            .post(SERVICE_EMBEDDER, &self.embedding_model, &BatchInputs { inputs: texts })
            .await?;
        batch_vectors(resp, texts.len())
    }

    fn name(&self) -> &'static str {
        "hf-inference"
    }
}

#[async_trait]
impl ZeroShotClassifier for HfInferenceClient {
    async fn score(&self, text: &str, labels: &[&str]) -> Result<Vec<(String, f32)>> {
        let body = ZeroShotReq {
            inputs: text,
            parameters: ZeroShotParams {
                candidate_labels: labels,
            },
        };
        let resp: ZeroShotResponse = self.post(SERVICE_ZERO_SHOT, &self.zero_shot_model, &body).await?;
        if resp.labels.len() != resp.scores.len() {
            return Err(AnalyzerError::upstream(SERVICE_ZERO_SHOT, "labels/scores length mismatch"));
        }
        Ok(resp.labels.into_iter().zip(resp.scores).collect())
    }
}

/// Split a batched response into one vector per input.
fn batch_vectors(resp: EmbedResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let vectors = match resp {
        EmbedResponse::Sentence(v) if expected == 1 => vec![v],
        EmbedResponse::Sentence(_) => Vec::new(),
        EmbedResponse::Tokens(rows) if expected == 1 && rows.len() != 1 => vec![mean_pool(&rows)],
        EmbedResponse::Tokens(rows) => rows,
        EmbedResponse::Batched(per_input) => per_input.iter().map(|t| mean_pool(t)).collect(),
    };
    if vectors.len() != expected || vectors.iter().any(Vec::is_empty) {
        return Err(AnalyzerError::upstream(
            SERVICE_EMBEDDER,
            format!("expected {expected} embeddings, got {}", vectors.len()),
        ));
    }
    Ok(vectors)
}

/// Average of token vectors; ragged rows are truncated to the shortest.
pub fn mean_pool(tokens: &[Vec<f32>]) -> Vec<f32> {
    let Some(dim) = tokens.iter().map(Vec::len).min() else {
        return Vec::new();
    };
    let mut out = vec![0.0f32; dim];
    for row in tokens {
        for (acc, x) in out.iter_mut().zip(row.iter()) {
            *acc += *x;
        }
    }
    let n = tokens.len() as f32;
    out.iter_mut().for_each(|x| *x /= n);
    out
}
