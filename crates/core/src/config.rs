//! Engine configuration.
//!
//! [`HarvestConfig`] carries the process-level knobs the CLI collects: the
//! cutoff threshold, output location, paging bounds, retry budgets, and the
//! timeout band for the rendering session.
//!
//! # Example
//!
//! ```rust
//! use gosi_core::{CutoffThreshold, HarvestConfig};
//!
//! let config = HarvestConfig::builder()
//!     .site_code("seoul-jongno")
//!     .cutoff(CutoffThreshold::Year(2025))
//!     .max_pages(50)
//!     .build();
//! ```

use crate::dates::CutoffThreshold;
use crate::sanitize::DEFAULT_TITLE_TRUNCATE;
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for one harvest run.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
    /// Site code: the per-municipality subdirectory under the output root.
    pub site_code: String,

    /// Root directory announcements are persisted under.
    pub output_root: PathBuf,

    /// Date/year boundary below which announcements are not collected.
    pub cutoff: CutoffThreshold,

    /// First list page to visit (default: 1).
    pub start_page: u32,

    /// Upper bound on pages visited, 0 = unlimited (default: 0).
    pub max_pages: u32,

    /// Consecutive empty-page budget before the run fails (default: 5).
    pub error_budget: u32,

    /// Attempts per page fetch and per detail fetch (default: 3).
    pub fetch_attempts: u32,

    /// Base delay for the linear page-retry backoff (default: 2s; attempt n
    /// waits n times this).
    pub retry_backoff: Duration,

    /// Settling delay between successful page fetches, covering
    /// script-driven re-rendering (default: 2s).
    pub settle_delay: Duration,

    /// Bounded wait for a structured download trigger (default: 45s).
    pub download_wait: Duration,

    /// Shorter bounded wait for the generic interactive trigger and the
    /// direct-link strategy (default: 15s).
    pub short_download_wait: Duration,

    /// Navigation / HTTP timeout (default: 30s).
    pub navigation_timeout: Duration,

    /// Truncation length for sanitized titles used as dedup keys and folder
    /// fragments (default: 100).
    pub title_truncate: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            site_code: String::new(),
            output_root: PathBuf::from("output"),
            cutoff: CutoffThreshold::Year(2025),
            start_page: 1,
            max_pages: 0,
            error_budget: 5,
            fetch_attempts: 3,
            retry_backoff: Duration::from_secs(2),
            settle_delay: Duration::from_secs(2),
            download_wait: Duration::from_secs(45),
            short_download_wait: Duration::from_secs(15),
            navigation_timeout: Duration::from_secs(30),
            title_truncate: DEFAULT_TITLE_TRUNCATE,
        }
    }
}

impl HarvestConfig {
    /// Creates a new builder with default values.
    pub fn builder() -> HarvestConfigBuilder {
        HarvestConfigBuilder::new()
    }

    /// Per-site output directory: `output_root/site_code`.
    pub fn site_dir(&self) -> PathBuf {
        self.output_root.join(&self.site_code)
    }
}

/// Builder for [`HarvestConfig`].
pub struct HarvestConfigBuilder {
    config: HarvestConfig,
}

impl HarvestConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: HarvestConfig::default() }
    }

    /// Sets the site code.
    pub fn site_code(mut self, value: impl Into<String>) -> Self {
        self.config.site_code = value.into();
        self
    }

    /// Sets the output root directory.
    pub fn output_root(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.output_root = value.into();
        self
    }

    /// Sets the cutoff threshold.
    pub fn cutoff(mut self, value: CutoffThreshold) -> Self {
        self.config.cutoff = value;
        self
    }

    /// Sets the starting page.
    pub fn start_page(mut self, value: u32) -> Self {
        self.config.start_page = value.max(1);
        self
    }

    /// Sets the maximum number of pages (0 = unlimited).
    pub fn max_pages(mut self, value: u32) -> Self {
        self.config.max_pages = value;
        self
    }

    /// Sets the consecutive empty-page budget.
    pub fn error_budget(mut self, value: u32) -> Self {
        self.config.error_budget = value;
        self
    }

    /// Sets the attempts per page/detail fetch.
    pub fn fetch_attempts(mut self, value: u32) -> Self {
        self.config.fetch_attempts = value.max(1);
        self
    }

    /// Sets the base retry backoff.
    pub fn retry_backoff(mut self, value: Duration) -> Self {
        self.config.retry_backoff = value;
        self
    }

    /// Sets the settling delay between page fetches.
    pub fn settle_delay(mut self, value: Duration) -> Self {
        self.config.settle_delay = value;
        self
    }

    /// Sets the bounded wait for structured download triggers.
    pub fn download_wait(mut self, value: Duration) -> Self {
        self.config.download_wait = value;
        self
    }

    /// Sets the shorter wait for interactive/direct-link strategies.
    pub fn short_download_wait(mut self, value: Duration) -> Self {
        self.config.short_download_wait = value;
        self
    }

    /// Sets the navigation timeout.
    pub fn navigation_timeout(mut self, value: Duration) -> Self {
        self.config.navigation_timeout = value;
        self
    }

    /// Sets the title truncation length.
    pub fn title_truncate(mut self, value: usize) -> Self {
        self.config.title_truncate = value.max(1);
        self
    }

    /// Builds the config.
    pub fn build(self) -> HarvestConfig {
        self.config
    }
}

impl Default for HarvestConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
