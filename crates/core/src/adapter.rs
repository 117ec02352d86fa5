//! The per-site extension point.
//!
//! Each municipality's board differs only in how list rows, detail views,
//! and attachment links are located; everything else (pagination, cutoff,
//! dedup, retries, persistence) lives in the engine. A site becomes one
//! small type implementing [`SiteAdapter`], never a subclassed scraper.

use crate::model::{Announcement, AttachmentRef, DetailContent};
use crate::session::RenderSession;
use crate::Result;
use async_trait::async_trait;

/// Capability set the engine is polymorphic over.
///
/// The engine owns retry, session recovery, and cutoff logic; adapter
/// methods should do one navigation or one extraction and report plain
/// results. An adapter returning an empty list from
/// [`SiteAdapter::extract_list_items`] signals a structural mismatch, not an
/// error; repeated empty pages are what trips the engine's error budget.
#[async_trait]
pub trait SiteAdapter: Send + Sync {
    /// URL of one list page.
    fn build_list_url(&self, page: u32) -> String;

    /// Extracts announcements from a rendered list page, in list order.
    fn extract_list_items(&self, rendered: &str) -> Result<Vec<Announcement>>;

    /// Navigates to an announcement's detail view and extracts it.
    ///
    /// Returns `Ok(None)` when the detail view exists but carries nothing
    /// extractable. Transient failures should be returned as errors; the
    /// engine retries and re-establishes the list view between attempts.
    async fn fetch_detail(
        &self,
        session: &mut dyn RenderSession,
        announcement: &Announcement,
    ) -> Result<Option<DetailContent>>;

    /// Extracts attachment references from a rendered detail view.
    fn extract_attachment_refs(&self, rendered_detail: &str) -> Result<Vec<AttachmentRef>>;
}
