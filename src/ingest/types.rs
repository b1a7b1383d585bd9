// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::ingest::sources::TrustedSource;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct HeadlineRecord {
    pub text: String,
    pub source_url: String,
    pub reliability: f32,
    pub region: String,
    pub fetched_at: DateTime<Utc>,
}

impl HeadlineRecord {
    pub fn from_source(text: String, source: &TrustedSource, fetched_at: DateTime<Utc>) -> Self {
        Self {
            text,
            source_url: source.url.clone(),
            reliability: source.reliability,
            region: source.region.clone(),
            fetched_at,
        }
    }
}

/// Pulls raw headline strings from one trusted source.
#[async_trait::async_trait]
pub trait HeadlineFetcher: Send + Sync {
    async fn fetch_headlines(&self, source: &TrustedSource, max: usize) -> Result<Vec<String>>;
    fn name(&self) -> &'static str;
}
