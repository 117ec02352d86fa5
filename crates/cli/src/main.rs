use std::path::PathBuf;

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use gosi_core::{
    BoardAdapter, BoardSelectors, BrowserlessSession, CutoffThreshold, HarvestConfig, HarvestEngine,
    JsonlFailureLogger, JsonlUrlStore,
};

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Harvest paginated municipal announcement boards into per-item folders
#[derive(Parser, Debug)]
#[command(name = "gosi")]
#[command(version = VERSION)]
#[command(about = "Harvest paginated municipal announcement boards", long_about = None)]
struct Args {
    /// Site code: output subdirectory under the output root
    #[arg(long, value_name = "CODE")]
    site: String,

    /// Base URL anchoring relative detail and attachment links
    #[arg(long, value_name = "URL")]
    base: String,

    /// List URL template containing {page}
    #[arg(long, value_name = "TEMPLATE")]
    list: String,

    /// Output root directory
    #[arg(short, long, default_value = "output", value_name = "DIR")]
    output: PathBuf,

    /// Stop once announcements fall below this year
    #[arg(long, default_value = "2025", value_name = "YYYY")]
    year: i32,

    /// Stop once announcements fall below this date (YYYY-MM-DD, overrides --year)
    #[arg(long, value_name = "DATE")]
    date: Option<String>,

    /// First list page to visit
    #[arg(long, default_value = "1", value_name = "NUM")]
    start_page: u32,

    /// Page limit, 0 = unlimited
    #[arg(long, default_value = "0", value_name = "NUM")]
    max_pages: u32,

    /// Consecutive empty-page budget before the run ends
    #[arg(long, default_value = "5", value_name = "NUM")]
    error_budget: u32,

    /// Title truncation length for dedup keys and folder names
    #[arg(long, default_value = "100", value_name = "NUM")]
    truncate: usize,

    /// Rendering service base URL (Browserless-compatible)
    #[arg(long, default_value = "http://localhost:3000", value_name = "URL")]
    renderer: String,

    /// Rendering service token
    #[arg(long, value_name = "TOKEN")]
    renderer_token: Option<String>,

    /// Append failures as JSON lines to this file
    #[arg(long, value_name = "FILE")]
    failure_log: Option<PathBuf>,

    /// Cross-run detail URL bookkeeping file
    #[arg(long, value_name = "FILE")]
    url_store: Option<PathBuf>,

    /// List row selector
    #[arg(long, value_name = "SEL")]
    row_selector: Option<String>,

    /// Title selector within a row
    #[arg(long, value_name = "SEL")]
    title_selector: Option<String>,

    /// Date selector within a row
    #[arg(long, value_name = "SEL")]
    date_selector: Option<String>,

    /// Detail body selector
    #[arg(long, value_name = "SEL")]
    body_selector: Option<String>,

    /// Detail date selector
    #[arg(long, value_name = "SEL")]
    detail_date_selector: Option<String>,

    /// Attachment link selector
    #[arg(long, value_name = "SEL")]
    attachment_selector: Option<String>,

    /// Native download-call pattern for structured acquisition
    #[arg(long, value_name = "REGEX")]
    download_call: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn cutoff(&self) -> anyhow::Result<CutoffThreshold> {
        match &self.date {
            Some(text) => {
                let date = NaiveDate::parse_from_str(text, "%Y-%m-%d")
                    .with_context(|| format!("Invalid --date value: {}", text))?;
                Ok(CutoffThreshold::Date(date))
            }
            None => Ok(CutoffThreshold::Year(self.year)),
        }
    }

    fn selectors(&self) -> BoardSelectors {
        let mut selectors = BoardSelectors::default();
        if let Some(s) = &self.row_selector {
            selectors.row = s.clone();
        }
        if let Some(s) = &self.title_selector {
            selectors.title = s.clone();
        }
        if let Some(s) = &self.date_selector {
            selectors.date = s.clone();
        }
        if let Some(s) = &self.body_selector {
            selectors.detail_body = s.clone();
        }
        if let Some(s) = &self.detail_date_selector {
            selectors.detail_date = Some(s.clone());
        }
        if let Some(s) = &self.attachment_selector {
            selectors.attachment_link = s.clone();
        }
        selectors
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = if args.verbose { "gosi_core=debug,gosi=debug" } else { "gosi_core=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(std::io::stderr)
        .init();

    if args.verbose {
        echo::print_banner();
    }

    let cutoff = args.cutoff()?;
    let config = HarvestConfig::builder()
        .site_code(&args.site)
        .output_root(&args.output)
        .cutoff(cutoff)
        .start_page(args.start_page)
        .max_pages(args.max_pages)
        .error_budget(args.error_budget)
        .title_truncate(args.truncate)
        .build();

    let mut adapter =
        BoardAdapter::new(&args.base, &args.list, args.selectors()).context("Failed to build site adapter")?;
    if let Some(pattern) = &args.download_call {
        adapter = adapter
            .with_download_call(pattern)
            .context("Invalid --download-call pattern")?;
    }

    let session = BrowserlessSession::new(&args.renderer, args.renderer_token.as_deref(), config.navigation_timeout)
        .context("Failed to initialize rendering session")?;

    echo::print_info(&format!("Harvesting {} from page {}", args.site, args.start_page));

    let mut engine = HarvestEngine::new(Box::new(adapter), Box::new(session), config);
    if let Some(path) = &args.failure_log {
        engine = engine.with_failure_logger(Box::new(JsonlFailureLogger::new(path)));
    }
    if let Some(path) = &args.url_store {
        engine = engine.with_url_store(Box::new(JsonlUrlStore::open(path)));
    }

    match engine.run().await {
        Ok(summary) => {
            echo::print_summary(&summary);
            echo::print_success(&format!("{} announcement(s) persisted", summary.items_persisted));
            Ok(())
        }
        Err(e) => {
            echo::print_error(&format!("Run aborted: {}", e));
            Err(e.into())
        }
    }
}
