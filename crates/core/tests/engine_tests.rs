//! End-to-end engine behavior over an in-memory site.
//!
//! The mock adapter encodes list pages as `page:N` URLs and hands out
//! scripted details, so every control-flow property (cutoff, dedup, error
//! budget, retry skips, attachment fallback) runs without a network.

use async_trait::async_trait;
use gosi_core::*;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Default, Clone)]
struct SiteCalls {
    detail_titles: Arc<Mutex<Vec<String>>>,
    pages_fetched: Arc<Mutex<Vec<u32>>>,
}

struct MockSite {
    /// Announcements per page, 1-indexed.
    pages: Vec<Vec<Announcement>>,
    details: HashMap<String, DetailContent>,
    fail_details: HashSet<String>,
    calls: SiteCalls,
}

impl MockSite {
    fn new(pages: Vec<Vec<Announcement>>) -> Self {
        Self { pages, details: HashMap::new(), fail_details: HashSet::new(), calls: SiteCalls::default() }
    }

    fn with_detail(mut self, locator: &str, detail: DetailContent) -> Self {
        self.details.insert(locator.to_string(), detail);
        self
    }

    fn failing_detail(mut self, locator: &str) -> Self {
        self.fail_details.insert(locator.to_string());
        self
    }
}

#[async_trait]
impl SiteAdapter for MockSite {
    fn build_list_url(&self, page: u32) -> String {
        format!("page:{}", page)
    }

    fn extract_list_items(&self, rendered: &str) -> Result<Vec<Announcement>> {
        let page: usize = rendered.strip_prefix("page:").unwrap_or("0").parse().unwrap_or(0);
        if page >= 1 {
            self.calls.pages_fetched.lock().unwrap().push(page as u32);
        }
        Ok(self.pages.get(page.saturating_sub(1)).cloned().unwrap_or_default())
    }

    async fn fetch_detail(
        &self,
        session: &mut dyn RenderSession,
        announcement: &Announcement,
    ) -> Result<Option<DetailContent>> {
        self.calls.detail_titles.lock().unwrap().push(announcement.title.clone());
        if self.fail_details.contains(&announcement.locator) {
            return Err(HarvestError::Render("scripted failure".to_string()));
        }
        session.navigate(&announcement.locator).await?;
        Ok(self.details.get(&announcement.locator).cloned())
    }

    fn extract_attachment_refs(&self, _rendered_detail: &str) -> Result<Vec<AttachmentRef>> {
        Ok(Vec::new())
    }
}

/// Session that echoes navigated URLs back as rendered content and serves
/// downloads from a script table.
struct MockSession {
    current: Option<String>,
    /// Url-trigger downloads: locator -> bytes.
    url_downloads: HashMap<String, Vec<u8>>,
    /// Script triggers always fail unless listed here.
    script_downloads: HashMap<String, Vec<u8>>,
}

impl MockSession {
    fn new() -> Self {
        Self { current: None, url_downloads: HashMap::new(), script_downloads: HashMap::new() }
    }
}

#[async_trait]
impl RenderSession for MockSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.current = Some(url.to_string());
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.current
            .clone()
            .ok_or_else(|| HarvestError::Render("nothing rendered".to_string()))
    }

    async fn download(&mut self, trigger: DownloadTrigger<'_>, _wait: Duration) -> Result<DownloadedFile> {
        let (table, key) = match trigger {
            DownloadTrigger::Url(url) => (&self.url_downloads, url),
            DownloadTrigger::Script(script) => (&self.script_downloads, script),
        };
        match table.get(key) {
            Some(bytes) => Ok(DownloadedFile { suggested_name: None, bytes: bytes.clone() }),
            None => Err(HarvestError::Render(format!("no download for {}", key))),
        }
    }

    async fn is_alive(&mut self) -> bool {
        true
    }

    async fn restart(&mut self) -> Result<()> {
        Ok(())
    }
}

fn announcement(title: &str, date: &str) -> Announcement {
    Announcement {
        title: title.to_string(),
        list_date_text: date.to_string(),
        locator: format!("detail:{}", title),
    }
}

fn detail_for(title: &str, date: &str) -> DetailContent {
    DetailContent {
        body_html: format!("<p>{} 본문</p>", title),
        date_text: date.to_string(),
        resolved_date: None,
        attachments: Vec::new(),
        source_url: format!("detail:{}", title),
    }
}

fn fast_config(dir: &TempDir) -> HarvestConfig {
    HarvestConfig::builder()
        .site_code("test-city")
        .output_root(dir.path())
        .cutoff(CutoffThreshold::Year(2025))
        .settle_delay(Duration::ZERO)
        .retry_backoff(Duration::ZERO)
        .build()
}

fn folders(dir: &TempDir) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir.path().join("test-city"))
        .unwrap()
        .flatten()
        .filter(|e| e.path().is_dir())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[tokio::test]
async fn cutoff_stops_run_before_next_page() {
    let dir = TempDir::new().unwrap();
    let site = MockSite::new(vec![
        vec![
            announcement("공고 A", "2025-01-10"),
            announcement("공고 B", "2025-01-05"),
            announcement("공고 C", "2024-12-20"),
        ],
        vec![announcement("공고 D", "2024-12-01")],
    ])
    .with_detail("detail:공고 A", detail_for("공고 A", "2025-01-10"))
    .with_detail("detail:공고 B", detail_for("공고 B", "2025-01-05"));
    let calls = site.calls.clone();

    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), fast_config(&dir));
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.items_persisted, 2);
    assert_eq!(summary.stopped_by, StopReason::Cutoff);
    assert_eq!(folders(&dir), vec!["001_공고 A", "002_공고 B"]);
    // The second page is never fetched after the stop signal.
    assert_eq!(*calls.pages_fetched.lock().unwrap(), vec![1]);
    // The below-threshold item never reaches the detail fetcher.
    assert!(!calls.detail_titles.lock().unwrap().contains(&"공고 C".to_string()));
}

#[tokio::test]
async fn rerun_is_idempotent_and_sequences_stay_monotonic() {
    let dir = TempDir::new().unwrap();
    let pages = vec![vec![
        announcement("공고 A", "2025-01-10"),
        announcement("공고 B", "2025-01-09"),
    ]];

    let site = MockSite::new(pages.clone())
        .with_detail("detail:공고 A", detail_for("공고 A", "2025-01-10"))
        .with_detail("detail:공고 B", detail_for("공고 B", "2025-01-09"));
    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), {
        let mut c = fast_config(&dir);
        c.max_pages = 1;
        c
    });
    let first = engine.run().await.unwrap();
    assert_eq!(first.items_persisted, 2);

    // Unchanged source, unchanged output: zero new folders.
    let site = MockSite::new(pages.clone())
        .with_detail("detail:공고 A", detail_for("공고 A", "2025-01-10"))
        .with_detail("detail:공고 B", detail_for("공고 B", "2025-01-09"));
    let calls = site.calls.clone();
    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), {
        let mut c = fast_config(&dir);
        c.max_pages = 1;
        c
    });
    let second = engine.run().await.unwrap();
    assert_eq!(second.items_persisted, 0);
    assert_eq!(second.items_skipped_duplicate, 2);
    assert!(calls.detail_titles.lock().unwrap().is_empty());

    // A new item resumes numbering past the existing maximum.
    let mut third_pages = pages;
    third_pages[0].push(announcement("공고 C", "2025-01-08"));
    let site = MockSite::new(third_pages)
        .with_detail("detail:공고 A", detail_for("공고 A", "2025-01-10"))
        .with_detail("detail:공고 B", detail_for("공고 B", "2025-01-09"))
        .with_detail("detail:공고 C", detail_for("공고 C", "2025-01-08"));
    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), {
        let mut c = fast_config(&dir);
        c.max_pages = 1;
        c
    });
    let third = engine.run().await.unwrap();
    assert_eq!(third.items_persisted, 1);
    assert_eq!(folders(&dir), vec!["001_공고 A", "002_공고 B", "003_공고 C"]);
}

#[tokio::test]
async fn error_budget_terminates_cleanly() {
    let dir = TempDir::new().unwrap();
    // Pre-existing work must survive a failing run.
    std::fs::create_dir_all(dir.path().join("test-city/001_예전 공고/attachments")).unwrap();

    let site = MockSite::new(vec![]); // every page is empty
    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), {
        let mut c = fast_config(&dir);
        c.fetch_attempts = 1;
        c
    });
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stopped_by, StopReason::ErrorBudget);
    assert_eq!(summary.pages_visited, 5);
    assert_eq!(summary.items_persisted, 0);
    assert_eq!(folders(&dir), vec!["001_예전 공고"]);
}

#[tokio::test]
async fn detail_failure_skips_item_and_continues() {
    let dir = TempDir::new().unwrap();
    let site = MockSite::new(vec![vec![
        announcement("실패 공고", "2025-01-10"),
        announcement("정상 공고", "2025-01-09"),
    ]])
    .failing_detail("detail:실패 공고")
    .with_detail("detail:정상 공고", detail_for("정상 공고", "2025-01-09"));

    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), {
        let mut c = fast_config(&dir);
        c.max_pages = 1;
        c
    });
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.items_skipped_failed, 1);
    assert_eq!(summary.items_persisted, 1);
    assert_eq!(folders(&dir), vec!["001_정상 공고"]);
}

#[tokio::test]
async fn detail_stage_cutoff_halts_run() {
    let dir = TempDir::new().unwrap();
    // List view shows no usable date; the detail view reveals 2024.
    let site = MockSite::new(vec![vec![
        announcement("구형 공고", ""),
        announcement("이후 공고", ""),
    ]])
    .with_detail("detail:구형 공고", detail_for("구형 공고", "2024-11-30"))
    .with_detail("detail:이후 공고", detail_for("이후 공고", "2025-01-02"));
    let calls = site.calls.clone();

    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), fast_config(&dir));
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stopped_by, StopReason::Cutoff);
    assert_eq!(summary.items_persisted, 0);
    // The item after the stop signal is never processed.
    assert_eq!(*calls.detail_titles.lock().unwrap(), vec!["구형 공고".to_string()]);
}

#[tokio::test]
async fn attachment_fallback_records_winning_strategy() {
    let dir = TempDir::new().unwrap();

    let mut detail = detail_for("첨부 공고", "2025-01-10");
    detail.attachments = vec![AttachmentRef {
        display_name: "공고문.hwp".to_string(),
        // Structured call whose payload embeds a URL: the chain tries the
        // structured script, then the direct link.
        acquisition_locator: "downFile('https://files.example/f/1.hwp')".to_string(),
        strategy: AttachmentStrategy::Structured,
    }];

    let site = MockSite::new(vec![vec![announcement("첨부 공고", "2025-01-10")]])
        .with_detail("detail:첨부 공고", detail);

    let mut session = MockSession::new();
    // Script strategies find nothing; the direct link serves the file.
    session
        .url_downloads
        .insert("https://files.example/f/1.hwp".to_string(), b"HWPDATA".to_vec());

    let engine = HarvestEngine::new(Box::new(site), Box::new(session), {
        let mut c = fast_config(&dir);
        c.max_pages = 1;
        c
    });
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.items_persisted, 1);
    assert_eq!(summary.attachment_failures, 0);

    let folder = dir.path().join("test-city/001_첨부 공고");
    let saved = folder.join("attachments/공고문.hwp");
    assert_eq!(std::fs::read(&saved).unwrap(), b"HWPDATA");
    // Only the winning strategy's file exists.
    assert_eq!(std::fs::read_dir(folder.join("attachments")).unwrap().count(), 1);

    let content = std::fs::read_to_string(folder.join("content.md")).unwrap();
    assert!(content.contains("공고문.hwp: https://files.example/f/1.hwp"));
}

#[tokio::test]
async fn exhausted_attachment_chain_still_persists_announcement() {
    let dir = TempDir::new().unwrap();

    let mut detail = detail_for("무첨부 공고", "2025-01-10");
    detail.attachments = vec![AttachmentRef {
        display_name: "유실된 파일.pdf".to_string(),
        // Unservable address: the direct-link and replay strategies both
        // fail fast without leaving the host.
        acquisition_locator: "https://127.0.0.1:9/gone.pdf".to_string(),
        strategy: AttachmentStrategy::DirectLink,
    }];

    let site = MockSite::new(vec![vec![announcement("무첨부 공고", "2025-01-10")]])
        .with_detail("detail:무첨부 공고", detail);

    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), {
        let mut c = fast_config(&dir);
        c.max_pages = 1;
        c
    });
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.items_persisted, 1);
    assert_eq!(summary.attachment_failures, 1);

    let folder = dir.path().join("test-city/001_무첨부 공고");
    let content = std::fs::read_to_string(folder.join("content.md")).unwrap();
    assert!(content.contains("유실된 파일.pdf: unresolved"));
    // Failed strategies leave nothing behind, not even a partial file.
    assert_eq!(std::fs::read_dir(folder.join("attachments")).unwrap().count(), 0);
}

#[tokio::test]
async fn page_limit_stops_run() {
    let dir = TempDir::new().unwrap();
    let site = MockSite::new(vec![
        vec![announcement("공고 A", "2025-01-10")],
        vec![announcement("공고 B", "2025-01-09")],
        vec![announcement("공고 C", "2025-01-08")],
    ])
    .with_detail("detail:공고 A", detail_for("공고 A", "2025-01-10"))
    .with_detail("detail:공고 B", detail_for("공고 B", "2025-01-09"))
    .with_detail("detail:공고 C", detail_for("공고 C", "2025-01-08"));

    let engine = HarvestEngine::new(Box::new(site), Box::new(MockSession::new()), {
        let mut c = fast_config(&dir);
        c.max_pages = 2;
        c
    });
    let summary = engine.run().await.unwrap();

    assert_eq!(summary.stopped_by, StopReason::PageLimit);
    assert_eq!(summary.pages_visited, 2);
    assert_eq!(summary.items_persisted, 2);
}
