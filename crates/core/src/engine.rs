//! The incremental harvest engine.
//!
//! [`HarvestEngine`] drives the page-by-page control loop: fetch one list
//! page (with retry and backoff), run every row through the cutoff filter
//! and the dedup store, fetch qualifying details, acquire attachments, and
//! persist one folder per announcement. No per-item or per-page error
//! terminates a run; only the consecutive-empty-page budget or a fatal
//! session initialization failure does, and every ending produces a
//! [`RunSummary`].
//!
//! Ordering guarantees: items are persisted in list order within a page,
//! pages are visited in strictly increasing order, and the first stop signal
//! from either cutoff check (list-stage or detail-stage) halts the whole
//! run.

use crate::adapter::SiteAdapter;
use crate::attachments::AcquisitionEngine;
use crate::config::HarvestConfig;
use crate::dates::should_stop;
use crate::dedup::DedupStore;
use crate::detail;
use crate::model::Announcement;
use crate::persist::PersistenceWriter;
use crate::session::RenderSession;
use crate::store::{DetailUrlRecord, FailureLogger, FailureRecord, TracingFailureLogger, UrlStore};
use crate::Result;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// An announcement crossed the cutoff threshold.
    Cutoff,
    /// The configured page limit was reached.
    PageLimit,
    /// Too many consecutive pages yielded nothing.
    ErrorBudget,
}

/// What a run accomplished, produced regardless of errors along the way.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub pages_visited: u32,
    pub items_persisted: u32,
    pub items_skipped_duplicate: u32,
    pub items_skipped_failed: u32,
    pub attachment_failures: u32,
    pub output_dir: PathBuf,
    pub stopped_by: StopReason,
}

/// Mutable loop state, threaded explicitly instead of living in globals.
///
/// The sequence counter and seen-title set live in the [`DedupStore`]; this
/// struct carries the paging side.
#[derive(Debug)]
struct ProcessingState {
    current_page: u32,
    consecutive_empty: u32,
    pages_visited: u32,
}

/// One sequential harvest run over one site.
pub struct HarvestEngine {
    adapter: Box<dyn SiteAdapter>,
    session: Box<dyn RenderSession>,
    config: HarvestConfig,
    failure_logger: Box<dyn FailureLogger>,
    url_store: Option<Box<dyn UrlStore>>,
}

impl HarvestEngine {
    pub fn new(adapter: Box<dyn SiteAdapter>, session: Box<dyn RenderSession>, config: HarvestConfig) -> Self {
        Self {
            adapter,
            session,
            config,
            failure_logger: Box::new(TracingFailureLogger),
            url_store: None,
        }
    }

    /// Replaces the default tracing failure logger.
    pub fn with_failure_logger(mut self, logger: Box<dyn FailureLogger>) -> Self {
        self.failure_logger = logger;
        self
    }

    /// Attaches an optional cross-run URL store.
    pub fn with_url_store(mut self, store: Box<dyn UrlStore>) -> Self {
        self.url_store = Some(store);
        self
    }

    /// Runs the harvest to completion.
    ///
    /// Errors are returned only for conditions that prevent the run from
    /// starting (unusable output directory, acquisition client build
    /// failure); everything after that is absorbed into the summary.
    pub async fn run(mut self) -> Result<RunSummary> {
        let site_dir = self.config.site_dir();
        let writer = PersistenceWriter::new(&site_dir, self.config.title_truncate);
        writer.ensure_site_dir()?;

        let mut dedup = DedupStore::from_output_dir(&site_dir, self.config.title_truncate);
        info!(
            site = %self.config.site_code,
            resumed_titles = dedup.len(),
            next_sequence = dedup.next_sequence(),
            "starting harvest"
        );

        let acquisition = AcquisitionEngine::new(&self.config)?;

        let mut state = ProcessingState {
            current_page: self.config.start_page,
            consecutive_empty: 0,
            pages_visited: 0,
        };
        let mut summary = RunSummary {
            pages_visited: 0,
            items_persisted: 0,
            items_skipped_duplicate: 0,
            items_skipped_failed: 0,
            attachment_failures: 0,
            output_dir: site_dir,
            stopped_by: StopReason::ErrorBudget,
        };

        'pages: loop {
            if self.config.max_pages > 0 && state.pages_visited >= self.config.max_pages {
                summary.stopped_by = StopReason::PageLimit;
                break;
            }

            let list_url = self.adapter.build_list_url(state.current_page);
            let items = self.fetch_page(&list_url).await;
            state.pages_visited += 1;
            summary.pages_visited = state.pages_visited;

            if items.is_empty() {
                state.consecutive_empty += 1;
                warn!(
                    page = state.current_page,
                    consecutive = state.consecutive_empty,
                    "page yielded no items"
                );
                if state.consecutive_empty >= self.config.error_budget {
                    summary.stopped_by = StopReason::ErrorBudget;
                    break;
                }
                state.current_page += 1;
                continue;
            }
            state.consecutive_empty = 0;

            for item in &items {
                // List-stage cutoff check: cheap, possibly imprecise.
                if should_stop(&item.list_date_text, self.config.cutoff) {
                    info!(title = %item.title, date = %item.list_date_text, "cutoff reached on list view");
                    summary.stopped_by = StopReason::Cutoff;
                    break 'pages;
                }

                if dedup.contains(&item.title) {
                    debug!(title = %item.title, "already persisted, skipping");
                    summary.items_skipped_duplicate += 1;
                    continue;
                }

                if !self.process_item(item, &list_url, &writer, &acquisition, &mut dedup, &mut summary).await {
                    summary.stopped_by = StopReason::Cutoff;
                    break 'pages;
                }
            }

            state.current_page += 1;
            tokio::time::sleep(self.config.settle_delay).await;
        }

        info!(
            persisted = summary.items_persisted,
            pages = summary.pages_visited,
            stopped_by = ?summary.stopped_by,
            "harvest finished"
        );
        Ok(summary)
    }

    /// Fetches and extracts one list page, retrying with linear backoff.
    ///
    /// Exhausted retries yield an empty page rather than an error; the
    /// consecutive-empty budget is what eventually ends a failing run.
    async fn fetch_page(&mut self, list_url: &str) -> Vec<Announcement> {
        for attempt in 1..=self.config.fetch_attempts {
            if !self.session.is_alive().await {
                warn!("rendering session lost before page fetch, restarting");
                if let Err(e) = self.session.restart().await {
                    warn!(error = %e, "session restart failed");
                    continue;
                }
            }

            let result = async {
                self.session.navigate(list_url).await?;
                // Let script-driven boards finish re-rendering before
                // extraction.
                tokio::time::sleep(self.config.settle_delay).await;
                let rendered = self.session.content().await?;
                self.adapter.extract_list_items(&rendered)
            }
            .await;

            match result {
                Ok(items) => {
                    debug!(url = %list_url, count = items.len(), "list page fetched");
                    return items;
                }
                Err(e) => {
                    warn!(url = %list_url, attempt, error = %e, "page fetch failed");
                    if attempt < self.config.fetch_attempts {
                        tokio::time::sleep(self.config.retry_backoff * attempt).await;
                    }
                }
            }
        }
        Vec::new()
    }

    /// Processes one announcement end to end.
    ///
    /// Returns `false` when the detail-stage cutoff fired and the run must
    /// stop; every other outcome (including failures) returns `true`.
    async fn process_item(
        &mut self,
        item: &Announcement,
        list_url: &str,
        writer: &PersistenceWriter,
        acquisition: &AcquisitionEngine,
        dedup: &mut DedupStore,
        summary: &mut RunSummary,
    ) -> bool {
        let detail = detail::fetch_detail(
            self.adapter.as_ref(),
            self.session.as_mut(),
            item,
            list_url,
            &self.config,
        )
        .await;

        let Some(detail) = detail else {
            self.log_failure(item, None, "detail_fetch", "retries exhausted");
            summary.items_skipped_failed += 1;
            return true;
        };

        // Detail-stage cutoff check: authoritative.
        if should_stop(&detail.date_text, self.config.cutoff) {
            info!(title = %item.title, date = %detail.date_text, "cutoff reached on detail view");
            return false;
        }

        let entry = match writer.prepare(dedup.next_sequence(), &item.title) {
            Ok(entry) => entry,
            Err(e) => {
                self.log_failure(item, Some(&detail.source_url), "persist", &e.to_string());
                summary.items_skipped_failed += 1;
                return true;
            }
        };

        let outcomes = acquisition
            .acquire_all(self.session.as_mut(), &detail.attachments, &entry.attachments_dir)
            .await;
        for outcome in &outcomes {
            if !outcome.is_saved() {
                summary.attachment_failures += 1;
                self.log_failure(item, Some(&detail.source_url), "attachment", outcome.display_name());
            }
        }

        if let Err(e) = writer.finalize(&entry, item, &detail, &outcomes) {
            self.log_failure(item, Some(&detail.source_url), "persist", &e.to_string());
            summary.items_skipped_failed += 1;
            // The folder must not survive without its content file: the
            // prefix would be reused and the resume scan would treat the
            // title as persisted.
            writer.discard(&entry);
            return true;
        }

        dedup.advance_sequence();
        dedup.record(&item.title);
        summary.items_persisted += 1;
        info!(sequence = entry.sequence, title = %item.title, "announcement persisted");

        if let Some(store) = self.url_store.as_mut() {
            store.save_detail_url(&DetailUrlRecord {
                site_code: self.config.site_code.clone(),
                title: item.title.clone(),
                detail_url: detail.source_url.clone(),
                batch_date: chrono::Utc::now().date_naive(),
                scraped: true,
            });
        }

        true
    }

    fn log_failure(&mut self, item: &Announcement, detail_url: Option<&str>, error_type: &str, message: &str) {
        self.failure_logger.log(&FailureRecord {
            site_code: self.config.site_code.clone(),
            title: item.title.clone(),
            url: item.locator.clone(),
            detail_url: detail_url.map(String::from),
            error_type: error_type.to_string(),
            error_message: message.to_string(),
        });
    }
}
