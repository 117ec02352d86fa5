//! Detail-view fetching with retry and session recovery.
//!
//! One announcement, up to `fetch_attempts` tries. A failed attempt (
//! navigation error, dead session, or a rendered page that looks like an
//! error/redirect interstitial) re-establishes a known-good state by
//! reloading the list view before the next try. Exhausted retries yield
//! `None`; the engine skips the item and the run continues.

use crate::adapter::SiteAdapter;
use crate::config::HarvestConfig;
use crate::dates::normalize_date;
use crate::model::{Announcement, DetailContent};
use crate::session::RenderSession;
use tracing::{debug, warn};

/// Substrings that mark an error or redirect interstitial rather than a
/// real detail view.
const ERROR_MARKERS: &[&str] = &[
    "시스템 오류",
    "오류가 발생",
    "페이지를 찾을 수 없습니다",
    "접근 권한이 없습니다",
    "location.replace",
    "location.href=",
    "http-equiv=\"refresh\"",
    "HTTP Status 404",
    "HTTP Status 500",
];

/// Heuristic: does this rendered body look like an error/redirect page?
///
/// Only short documents are considered; a long announcement body that
/// happens to mention an error phrase is accepted as content.
pub fn looks_like_error_page(html: &str) -> bool {
    if html.len() > 4096 {
        return false;
    }
    let lowered = html.to_lowercase();
    ERROR_MARKERS.iter().any(|marker| lowered.contains(&marker.to_lowercase()))
}

/// Fetches one announcement's detail view, retrying on transient failure.
///
/// A successful result always carries a resolved date when one is
/// recoverable: the detail-view date text is preferred, the list-view text
/// is the fallback.
pub async fn fetch_detail(
    adapter: &dyn SiteAdapter,
    session: &mut dyn RenderSession,
    announcement: &Announcement,
    list_url: &str,
    config: &HarvestConfig,
) -> Option<DetailContent> {
    for attempt in 1..=config.fetch_attempts {
        if !session.is_alive().await {
            warn!(title = %announcement.title, "rendering session lost, restarting");
            if let Err(e) = session.restart().await {
                warn!(error = %e, "session restart failed");
                continue;
            }
        }

        match adapter.fetch_detail(session, announcement).await {
            Ok(Some(mut detail)) if !looks_like_error_page(&detail.body_html) => {
                if detail.date_text.trim().is_empty() {
                    detail.date_text = announcement.list_date_text.clone();
                }
                detail.resolved_date = normalize_date(&detail.date_text)
                    .or_else(|| normalize_date(&announcement.list_date_text));
                return Some(detail);
            }
            Ok(Some(_)) => {
                debug!(title = %announcement.title, attempt, "detail view looks like an error page");
            }
            Ok(None) => {
                debug!(title = %announcement.title, attempt, "detail view yielded no content");
            }
            Err(e) => {
                debug!(title = %announcement.title, attempt, error = %e, "detail fetch failed");
            }
        }

        if attempt < config.fetch_attempts {
            // Re-establish a known-good navigation state before retrying.
            if let Err(e) = session.navigate(list_url).await {
                debug!(error = %e, "list reload between retries failed");
            }
            tokio::time::sleep(config.retry_backoff * attempt).await;
        }
    }

    warn!(title = %announcement.title, "detail fetch exhausted retries, skipping item");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_markers_detected() {
        assert!(looks_like_error_page("<html><body>시스템 오류가 발생했습니다</body></html>"));
        assert!(looks_like_error_page("<script>location.replace('/login')</script>"));
        assert!(looks_like_error_page("<h1>HTTP Status 404 – Not Found</h1>"));
    }

    #[test]
    fn test_normal_body_accepted() {
        assert!(!looks_like_error_page("<p>2025년도 물품구매 입찰 공고</p>"));
    }

    #[test]
    fn test_long_body_never_flagged() {
        // A real announcement quoting an error phrase must not be rejected.
        let body = format!("{}{}", "내용 ".repeat(2000), "오류가 발생할 경우 연락 바랍니다");
        assert!(!looks_like_error_page(&body));
    }
}
