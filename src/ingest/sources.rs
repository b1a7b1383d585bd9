// src/ingest/sources.rs
//! Trusted source registry: each homepage carries a static reliability weight and a region.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustedSource {
    pub url: String,
    /// Static trust weight in [0,1].
    pub reliability: f32,
    pub region: String,
}

impl TrustedSource {
    pub fn new(url: &str, reliability: f32, region: &str) -> Self {
        Self {
            url: url.to_string(),
            reliability: reliability.clamp(0.0, 1.0),
            region: region.to_string(),
        }
    }
}

/// Built-in registry used when the config file lists no `[[sources]]`.
pub fn default_registry() -> Vec<TrustedSource> {
    vec![
        TrustedSource::new("https://www.bbc.com/news", 0.95, "global"),
        TrustedSource::new("https://www.reuters.com", 0.98, "global"),
        TrustedSource::new("https://www.apnews.com", 0.96, "global"),
        TrustedSource::new("https://www.cnn.com", 0.85, "us"),
        TrustedSource::new("https://www.nytimes.com", 0.90, "us"),
        TrustedSource::new("https://www.theguardian.com", 0.88, "uk"),
        TrustedSource::new("https://www.washingtonpost.com", 0.89, "us"),
        TrustedSource::new("https://www.aljazeera.com", 0.82, "global"),
        TrustedSource::new("https://www.npr.org", 0.91, "us"),
        TrustedSource::new("https://www.hindustantimes.com", 0.78, "india"),
    ]
}
