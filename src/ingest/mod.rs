// src/ingest/mod.rs
//! Trusted-headline ingest: a date-keyed, time-boxed cache in front of a concurrent
//! fan-out over the source registry.

pub mod cache;
pub mod providers;
pub mod sources;
pub mod types;

use chrono::{Local, Utc};
use futures::stream::{self, StreamExt};
use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::AnalyzerConfig;
use crate::ingest::cache::SlotStore;
use crate::ingest::sources::TrustedSource;
use crate::ingest::types::{HeadlineFetcher, HeadlineRecord};
use crate::metrics::ensure_metrics_described;

/// Sources fetched at once.
const FETCH_CONCURRENCY: usize = 8;

/// Shorter headlines carry too little to match against.
pub const DEFAULT_MIN_HEADLINE_WORDS: usize = 4;

pub struct HeadlineCache {
    store: SlotStore,
    fetcher: Arc<dyn HeadlineFetcher>,
    sources: Vec<TrustedSource>,
    max_age: Duration,
    fetch_timeout: Duration,
    min_words: usize,
}

impl HeadlineCache {
    pub fn new(
        store: SlotStore,
        fetcher: Arc<dyn HeadlineFetcher>,
        sources: Vec<TrustedSource>,
        max_age: Duration,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            sources,
            max_age,
            fetch_timeout,
            min_words: DEFAULT_MIN_HEADLINE_WORDS,
        }
    }

    pub fn with_min_words(mut self, min_words: usize) -> Self {
        self.min_words = min_words;
        self
    }

    pub fn from_config(cfg: &AnalyzerConfig, fetcher: Arc<dyn HeadlineFetcher>) -> Self {
        Self::new(
            SlotStore::new(cfg.cache.dir.clone(), &cfg.cache.cache_type),
            fetcher,
            cfg.sources.clone(),
            cfg.cache.max_age(),
            cfg.timeouts.fetch(),
        )
        .with_min_words(cfg.fact_check.min_headline_words)
    }

    pub fn store(&self) -> &SlotStore {
        &self.store
    }

    /// Today's slot if fresh, else a full refresh from every source.
    ///
    /// Never fails: unreadable slots count as misses, failing sources are skipped, and a
    /// failed write only loses the cache for the next caller.
    pub async fn fetch_trusted_headlines(&self, max_per_source: usize) -> Vec<HeadlineRecord> {
        ensure_metrics_described();
        let today = Local::now().date_naive();

        match self.store.load_fresh(today, self.max_age) {
            Ok(Some(mut records)) => {
                records.retain(|r| self.long_enough(&r.text));
                if !records.is_empty() {
                    counter!("headline_cache_hits_total").increment(1);
                    return records;
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(target: "fact_check", error = %e, "headline cache unreadable, refetching");
            }
        }
        counter!("headline_cache_misses_total").increment(1);

        let t0 = std::time::Instant::now();
        let records = self.refresh(max_per_source).await;
        histogram!("headline_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        if let Err(e) = self.store.save(today, &records) {
            warn!(target: "fact_check", error = %e, "failed to write headline cache");
        }
        info!(target: "fact_check", total = records.len(), sources = self.sources.len(), "headline refresh done");
        records
    }

    /// Fetch every source concurrently; one source's failure or timeout never affects the others.
    async fn refresh(&self, max_per_source: usize) -> Vec<HeadlineRecord> {
        let fetched_at = Utc::now();
        let fetcher = &self.fetcher;
        let timeout = self.fetch_timeout;

        let per_source: Vec<Vec<HeadlineRecord>> = stream::iter(self.sources.iter())
            .map(|source| async move {
                match tokio::time::timeout(timeout, fetcher.fetch_headlines(source, max_per_source)).await {
                    Ok(Ok(texts)) => {
                        info!(target: "fact_check", source = %source.url, count = texts.len(), "fetched headlines");
                        texts
                            .into_iter()
                            .filter(|t| self.long_enough(t))
                            .take(max_per_source)
                            .map(|t| HeadlineRecord::from_source(t, source, fetched_at))
                            .collect()
                    }
                    Ok(Err(e)) => {
                        warn!(target: "fact_check", error = ?e, source = %source.url, provider = fetcher.name(), "source fetch failed");
                        counter!("headline_source_errors_total").increment(1);
                        Vec::new()
                    }
                    Err(_) => {
                        warn!(target: "fact_check", source = %source.url, timeout_ms = timeout.as_millis() as u64, "source fetch timed out");
                        counter!("headline_source_errors_total").increment(1);
                        Vec::new()
                    }
                }
            })
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        per_source.into_iter().flatten().collect()
    }

    fn long_enough(&self, text: &str) -> bool {
        text.split_whitespace().count() >= self.min_words
    }
}
