// src/ingest/cache.rs
//! On-disk headline cache: one JSON array of `HeadlineRecord` per slot, named
//! `{cache_type}_{YYYY-MM-DD}.json`. Freshness is judged from the file's mtime.
//!
//! Writes go through a temp file + rename, so readers never see a half-written slot.
//! Concurrent refreshers simply overwrite each other; the content is equivalent.

use chrono::NaiveDate;
use metrics::counter;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};

use crate::error::{AnalyzerError, Result};
use crate::ingest::types::HeadlineRecord;

#[derive(Debug, Clone)]
pub struct SlotStore {
    dir: PathBuf,
    cache_type: String,
}

impl SlotStore {
    pub fn new(dir: impl Into<PathBuf>, cache_type: &str) -> Self {
        Self {
            dir: dir.into(),
            cache_type: cache_type.to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn slot_path(&self, date: NaiveDate) -> PathBuf {
        self.dir
            .join(format!("{}_{}.json", self.cache_type, date.format("%Y-%m-%d")))
    }

    /// Records of the slot for `date` if the file exists and is younger than `max_age`.
    ///
    /// `Ok(None)` for missing/stale slots. A slot that is not a JSON array at all is a
    /// `DataCorrupt` error; individual malformed records are skipped and counted.
    pub fn load_fresh(&self, date: NaiveDate, max_age: Duration) -> Result<Option<Vec<HeadlineRecord>>> {
        let path = self.slot_path(date);
        let meta = match fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let modified = meta.modified()?;
        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or_default();
        if age > max_age {
            return Ok(None);
        }

        let content = fs::read_to_string(&path)?;
        let raw: Vec<serde_json::Value> =
            serde_json::from_str(&content).map_err(|e| AnalyzerError::DataCorrupt {
                location: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let mut out = Vec::with_capacity(raw.len());
        for (idx, value) in raw.into_iter().enumerate() {
            match serde_json::from_value::<HeadlineRecord>(value) {
                Ok(rec) => out.push(rec),
                Err(e) => {
                    warn!(target: "fact_check", slot = %path.display(), idx, error = %e, "skipping corrupt headline record");
                    counter!("headline_records_corrupt_total").increment(1);
                }
            }
        }
        info!(target: "fact_check", slot = %path.display(), records = out.len(), "loaded headline cache slot");
        Ok(Some(out))
    }

    /// Overwrite the slot for `date`.
    pub fn save(&self, date: NaiveDate, records: &[HeadlineRecord]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(date);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(records).map_err(|e| AnalyzerError::DataCorrupt {
            location: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let mut f = fs::File::create(&tmp)?;
        f.write_all(json.as_bytes())?;
        f.sync_all()?;
        fs::rename(&tmp, &path)?;
        info!(target: "fact_check", slot = %path.display(), records = records.len(), "cached headlines");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rec(text: &str) -> HeadlineRecord {
        HeadlineRecord {
            text: text.into(),
            source_url: "https://www.reuters.com".into(),
            reliability: 0.98,
            region: "global".into(),
            fetched_at: Utc::now(),
        }
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    #[test]
    fn slot_name_is_type_and_iso_date() {
        let s = SlotStore::new("/tmp/x", "trusted_headlines");
        assert!(s.slot_path(day()).ends_with("trusted_headlines_2024-03-09.json"));
    }

    #[test]
    fn save_then_load_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let s = SlotStore::new(dir.path(), "trusted_headlines");
        assert!(s.load_fresh(day(), Duration::from_secs(60)).unwrap().is_none());

        s.save(day(), &[rec("Senate passes the budget bill")]).unwrap();
        let got = s.load_fresh(day(), Duration::from_secs(60)).unwrap().unwrap();
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].text, "Senate passes the budget bill");
        assert!(!s.slot_path(day()).with_extension("json.tmp").exists());
    }

    #[test]
    fn zero_max_age_is_stale() {
        let dir = tempfile::tempdir().unwrap();
        let s = SlotStore::new(dir.path(), "t");
        s.save(day(), &[rec("Senate passes the budget bill")]).unwrap();
        std::thread::sleep(Duration::from_millis(20));
        assert!(s.load_fresh(day(), Duration::ZERO).unwrap().is_none());
    }

    #[test]
    fn corrupt_records_are_skipped_and_garbage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let s = SlotStore::new(dir.path(), "t");
        let good = serde_json::to_value(rec("Markets rally as inflation cools")).unwrap();
        let body = serde_json::json!([good, {"text": 42}, "nope"]);
        fs::write(s.slot_path(day()), body.to_string()).unwrap();
        let got = s.load_fresh(day(), Duration::from_secs(60)).unwrap().unwrap();
        assert_eq!(got.len(), 1);

        fs::write(s.slot_path(day()), "{not json").unwrap();
        let err = s.load_fresh(day(), Duration::from_secs(60)).unwrap_err();
        assert!(matches!(err, AnalyzerError::DataCorrupt { .. }));
    }
}
