//! Typed errors for collaborator calls, cache slots and configuration.
//!
//! None of these ever crosses the pipeline boundary: `Analyzer::analyze` degrades each one
//! to a documented neutral default and logs it.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AnalyzerError>;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// Classifier, embedder, zero-shot, completion or source fetch failed.
    #[error("upstream `{service}` unavailable: {reason}")]
    UpstreamUnavailable {
        service: &'static str,
        reason: String,
    },

    /// An external call exceeded its time ceiling.
    #[error("upstream `{service}` timed out after {ms}ms")]
    Timeout { service: &'static str, ms: u64 },

    /// Empty or too-short text.
    #[error("input rejected: {0}")]
    InputInvalid(String),

    /// Malformed cache entry or persisted record.
    #[error("corrupt record in {location}: {reason}")]
    DataCorrupt { location: String, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalyzerError {
    pub fn upstream(service: &'static str, reason: impl ToString) -> Self {
        Self::UpstreamUnavailable {
            service,
            reason: reason.to_string(),
        }
    }

    /// Service name for metrics labels; `"internal"` for non-upstream errors.
    pub fn service(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { service, .. } | Self::Timeout { service, .. } => service,
            _ => "internal",
        }
    }
}

impl From<reqwest::Error> for AnalyzerError {
    fn from(e: reqwest::Error) -> Self {
        let service = if e.is_timeout() { "http-timeout" } else { "http" };
        Self::upstream(service, e)
    }
}
