// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod similarity;
pub mod text;

// News gate (rule features + optional zero-shot)
pub mod gate;

// Trusted headline sources, slot cache, fact verification
pub mod fact_check;
pub mod ingest;

// Model adapters (hosted inference + local deterministic fakes)
pub mod providers;

// Pipeline: forensic, labels, correction, explanation
pub mod analyze;

// ---- Re-exports for stable public API ----
pub use analyze::ai_adapter;
pub use analyze::{AnalysisRecord, Analyzer, Services};
pub use config::AnalyzerConfig;
pub use error::AnalyzerError;
