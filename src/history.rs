//! Verdict log: every completed analysis is handed to a `VerdictSink`.
//! `History` is the in-memory bounded sink; durable storage plugs in behind the same trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::analyze::correction::CorrectedVerdict;
use crate::analyze::labels::RawLabel;
use crate::fact_check::FactStatus;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictLogEntry {
    pub timestamp: DateTime<Utc>,
    pub text: String,
    pub classifier_label: RawLabel,
    pub verdict: CorrectedVerdict,
    pub fact_status: FactStatus,
}

pub trait VerdictSink: Send + Sync {
    fn record(&self, entry: VerdictLogEntry);
}

/// Discards everything.
pub struct NullSink;

impl VerdictSink for NullSink {
    fn record(&self, _entry: VerdictLogEntry) {}
}

#[derive(Debug)]
pub struct History {
    inner: Mutex<Vec<VerdictLogEntry>>,
    cap: usize,
}

impl History {
    pub fn with_capacity(cap: usize) -> Self {
        let cap = cap.clamp(1, 10_000);
        Self {
            inner: Mutex::new(Vec::with_capacity(cap)),
            cap,
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot_last_n(&self, n: usize) -> Vec<VerdictLogEntry> {
        match self.inner.lock() {
            Ok(v) => {
                let start = v.len().saturating_sub(n);
                v[start..].to_vec()
            }
            Err(_) => Vec::new(),
        }
    }
}

impl VerdictSink for History {
    fn record(&self, entry: VerdictLogEntry) {
        let Ok(mut v) = self.inner.lock() else {
            return;
        };
        v.push(entry);
        if v.len() > self.cap {
            let excess = v.len() - self.cap;
            v.drain(0..excess);
        }
    }
}
