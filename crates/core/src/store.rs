//! Failure logging and optional cross-run URL bookkeeping.
//!
//! Both collaborators are fire-and-forget: errors raised while logging a
//! failure or saving a URL record are swallowed (with a tracing warning) so
//! bookkeeping can never take down a run.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use tracing::warn;

/// One per-item failure, as reported to the failure logger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub site_code: String,
    pub title: String,
    pub url: String,
    pub detail_url: Option<String>,
    pub error_type: String,
    pub error_message: String,
}

/// Fire-and-forget failure sink.
pub trait FailureLogger: Send {
    /// Records a failure. Implementations must not propagate their own
    /// errors.
    fn log(&mut self, record: &FailureRecord);
}

/// Default logger: failures go to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingFailureLogger;

impl FailureLogger for TracingFailureLogger {
    fn log(&mut self, record: &FailureRecord) {
        warn!(
            site = %record.site_code,
            title = %record.title,
            error_type = %record.error_type,
            error = %record.error_message,
            "item failed"
        );
    }
}

/// Appends failures as JSON lines to a file.
#[derive(Debug)]
pub struct JsonlFailureLogger {
    path: PathBuf,
}

impl JsonlFailureLogger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl FailureLogger for JsonlFailureLogger {
    fn log(&mut self, record: &FailureRecord) {
        let Ok(line) = serde_json::to_string(record) else {
            return;
        };
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut f| writeln!(f, "{}", line));
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "failure log write dropped");
        }
    }
}

/// One detail URL seen during a run, for cross-run bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailUrlRecord {
    pub site_code: String,
    pub title: String,
    pub detail_url: String,
    pub batch_date: NaiveDate,
    pub scraped: bool,
}

/// Aggregate counts for one site and batch date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UrlStats {
    pub total: usize,
    pub scraped: usize,
    pub unscraped: usize,
}

/// Optional cross-run URL store.
///
/// The engine runs fine without one; when present, every processed detail
/// URL is offered to it.
pub trait UrlStore: Send {
    /// Saves a record; `false` means it was already present.
    fn save_detail_url(&mut self, record: &DetailUrlRecord) -> bool;

    /// Counts for one site and batch date.
    fn stats(&self, site_code: &str, batch_date: NaiveDate) -> UrlStats;
}

/// JSONL-file URL store, loaded whole at open and appended on save.
#[derive(Debug)]
pub struct JsonlUrlStore {
    path: PathBuf,
    records: Vec<DetailUrlRecord>,
}

impl JsonlUrlStore {
    /// Opens a store, loading any existing records. Unreadable lines are
    /// skipped.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = std::fs::read_to_string(&path)
            .map(|text| {
                text.lines()
                    .filter_map(|line| serde_json::from_str(line).ok())
                    .collect()
            })
            .unwrap_or_default();
        Self { path, records }
    }
}

impl UrlStore for JsonlUrlStore {
    fn save_detail_url(&mut self, record: &DetailUrlRecord) -> bool {
        let exists = self
            .records
            .iter()
            .any(|r| r.site_code == record.site_code && r.detail_url == record.detail_url);
        if exists {
            return false;
        }

        if let Ok(line) = serde_json::to_string(record) {
            let result = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&self.path)
                .and_then(|mut f| writeln!(f, "{}", line));
            if let Err(e) = result {
                warn!(path = %self.path.display(), error = %e, "url store write dropped");
            }
        }

        self.records.push(record.clone());
        true
    }

    fn stats(&self, site_code: &str, batch_date: NaiveDate) -> UrlStats {
        let mut stats = UrlStats::default();
        for record in &self.records {
            if record.site_code != site_code || record.batch_date != batch_date {
                continue;
            }
            stats.total += 1;
            if record.scraped {
                stats.scraped += 1;
            } else {
                stats.unscraped += 1;
            }
        }
        stats
    }
}
