// src/metrics.rs
//! Counter/histogram registration and the optional Prometheus recorder.
//!
//! Without an installed recorder every `counter!`/`histogram!` call is a no-op, so the
//! library works (and tests run) without touching global state.

use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series carry help text when rendered).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("analysis_requests_total", "Texts submitted to analyze/quick_classify.");
        describe_counter!("analysis_not_news_total", "Texts rejected by the news gate.");
        describe_counter!(
            "correction_applied_total",
            "Classifier verdicts changed by a correction rule (label: rule)."
        );
        describe_counter!(
            "upstream_fallback_total",
            "Collaborator failures degraded to a neutral default (label: service)."
        );
        describe_counter!("headline_cache_hits_total", "Fresh headline cache slot reused.");
        describe_counter!("headline_cache_misses_total", "Headline cache slot missing or stale.");
        describe_counter!("headline_source_errors_total", "Trusted source fetch/parse failures.");
        describe_counter!(
            "headline_records_corrupt_total",
            "Malformed records skipped while reading a cache slot."
        );
        describe_histogram!("headline_fetch_ms", "Full trusted-source refresh time in milliseconds.");
        describe_histogram!("headline_parse_ms", "Heading extraction time per page in milliseconds.");
        describe_histogram!("analysis_ms", "End-to-end analyze() time in milliseconds.");
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder process-wide. Fails if a recorder is already set.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Prometheus exposition text.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}
