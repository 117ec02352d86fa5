//! Generic selector-driven board adapter.
//!
//! Most municipal boards are a table of rows with a title link and a date
//! cell, reachable by plain URLs. [`BoardAdapter`] covers those with a
//! [`BoardSelectors`] value instead of per-site code. Boards that navigate
//! exclusively through script calls (form submits, Vue modals) need their
//! own [`SiteAdapter`](crate::SiteAdapter) implementation; the attachment
//! side of script-driven sites is still handled here through onclick
//! capture.

use crate::model::{Announcement, AttachmentRef, AttachmentStrategy, DetailContent};
use crate::session::RenderSession;
use crate::{HarvestError, Result, SiteAdapter};
use async_trait::async_trait;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// CSS selectors describing one board's markup.
#[derive(Debug, Clone)]
pub struct BoardSelectors {
    /// One announcement row on the list page.
    pub row: String,
    /// Title element within a row.
    pub title: String,
    /// Date element within a row.
    pub date: String,
    /// Link element within a row; defaults to the title element.
    pub link: Option<String>,
    /// Attribute carrying the detail reference (default `href`).
    pub link_attr: String,
    /// Body container on the detail view.
    pub detail_body: String,
    /// Date element on the detail view; list date is used when absent.
    pub detail_date: Option<String>,
    /// Attachment anchor elements on the detail view.
    pub attachment_link: String,
}

impl Default for BoardSelectors {
    fn default() -> Self {
        Self {
            row: "table.board_list tbody tr".to_string(),
            title: "td.title a".to_string(),
            date: "td.date".to_string(),
            link: None,
            link_attr: "href".to_string(),
            detail_body: "div.board_view div.content".to_string(),
            detail_date: Some("div.board_view span.date".to_string()),
            attachment_link: "div.file_list a".to_string(),
        }
    }
}

/// Selector-configured [`SiteAdapter`] for href-navigable boards.
pub struct BoardAdapter {
    base_url: Url,
    /// List URL template containing a `{page}` placeholder.
    list_url_template: String,
    selectors: BoardSelectors,
    /// Matches the site's native download function call in onclick
    /// attributes, e.g. `fn_egov_downFile('FILE_123','0')`. Matching links
    /// are acquired through the structured strategy first.
    download_call: Option<Regex>,
}

impl BoardAdapter {
    /// Creates an adapter for a board.
    ///
    /// `list_url_template` must contain `{page}`; `base_url` anchors
    /// relative detail and attachment links.
    pub fn new(base_url: &str, list_url_template: &str, selectors: BoardSelectors) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| HarvestError::InvalidUrl(e.to_string()))?;
        if !list_url_template.contains("{page}") {
            return Err(HarvestError::Config("list URL template must contain {page}".to_string()));
        }

        Ok(Self { base_url, list_url_template: list_url_template.to_string(), selectors, download_call: None })
    }

    /// Sets the native download-call pattern for structured acquisition.
    pub fn with_download_call(mut self, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| HarvestError::Selector { selector: pattern.to_string(), message: e.to_string() })?;
        self.download_call = Some(re);
        Ok(self)
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| HarvestError::Selector { selector: s.to_string(), message: format!("{e:?}") })
    }

    fn resolve(&self, href: &str) -> String {
        match self.base_url.join(href) {
            Ok(url) => url.to_string(),
            Err(_) => href.to_string(),
        }
    }

    fn element_text(el: &ElementRef<'_>) -> String {
        let raw: String = el.text().collect();
        raw.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn classify_attachment(&self, el: &ElementRef<'_>) -> Option<AttachmentRef> {
        let display_name = Self::element_text(el);
        if display_name.is_empty() {
            return None;
        }

        let href = el.value().attr("href").unwrap_or("");
        let onclick = el.value().attr("onclick").unwrap_or("");

        if let Some(re) = &self.download_call {
            for candidate in [onclick, href] {
                if let Some(m) = re.find(candidate) {
                    return Some(AttachmentRef {
                        display_name,
                        acquisition_locator: m.as_str().to_string(),
                        strategy: AttachmentStrategy::Structured,
                    });
                }
            }
        }

        if let Some(payload) = href.strip_prefix("javascript:") {
            let locator = if payload.trim().is_empty() { onclick.to_string() } else { payload.to_string() };
            if locator.is_empty() {
                return None;
            }
            return Some(AttachmentRef {
                display_name,
                acquisition_locator: locator,
                strategy: AttachmentStrategy::Interactive,
            });
        }

        if !onclick.is_empty() {
            return Some(AttachmentRef {
                display_name,
                acquisition_locator: onclick.to_string(),
                strategy: AttachmentStrategy::Interactive,
            });
        }

        if !href.is_empty() {
            return Some(AttachmentRef {
                display_name,
                acquisition_locator: self.resolve(href),
                strategy: AttachmentStrategy::DirectLink,
            });
        }

        None
    }
}

#[async_trait]
impl SiteAdapter for BoardAdapter {
    fn build_list_url(&self, page: u32) -> String {
        self.list_url_template.replace("{page}", &page.to_string())
    }

    fn extract_list_items(&self, rendered: &str) -> Result<Vec<Announcement>> {
        let document = Html::parse_document(rendered);
        let row_sel = Self::parse_selector(&self.selectors.row)?;
        let title_sel = Self::parse_selector(&self.selectors.title)?;
        let date_sel = Self::parse_selector(&self.selectors.date)?;
        let link_sel = self
            .selectors
            .link
            .as_ref()
            .map(|s| Self::parse_selector(s))
            .transpose()?;

        let mut items = Vec::new();
        for row in document.select(&row_sel) {
            let Some(title_el) = row.select(&title_sel).next() else { continue };
            let title = Self::element_text(&title_el);
            if title.is_empty() {
                continue;
            }

            let list_date_text = row.select(&date_sel).next().map(|el| Self::element_text(&el)).unwrap_or_default();

            let link_el = link_sel
                .as_ref()
                .and_then(|sel| row.select(sel).next())
                .unwrap_or(title_el);
            let raw = link_el.value().attr(&self.selectors.link_attr).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            let locator =
                if raw.starts_with("javascript:") { raw.to_string() } else { self.resolve(raw) };

            items.push(Announcement { title, list_date_text, locator });
        }

        Ok(items)
    }

    async fn fetch_detail(
        &self,
        session: &mut dyn RenderSession,
        announcement: &Announcement,
    ) -> Result<Option<DetailContent>> {
        if announcement.locator.starts_with("javascript:") {
            // Script-only navigation needs a dedicated adapter.
            return Err(HarvestError::Render(format!(
                "script locator not navigable by BoardAdapter: {}",
                announcement.locator
            )));
        }

        session.navigate(&announcement.locator).await?;
        let rendered = session.content().await?;

        let document = Html::parse_document(&rendered);
        let body_sel = Self::parse_selector(&self.selectors.detail_body)?;
        let Some(body_el) = document.select(&body_sel).next() else {
            return Ok(None);
        };

        let date_text = self
            .selectors
            .detail_date
            .as_ref()
            .map(|s| Self::parse_selector(s))
            .transpose()?
            .and_then(|sel| document.select(&sel).next().map(|el| Self::element_text(&el)))
            .unwrap_or_default();

        let attachments = self.extract_attachment_refs(&rendered)?;

        Ok(Some(DetailContent {
            body_html: body_el.inner_html(),
            date_text,
            resolved_date: None,
            attachments,
            source_url: announcement.locator.clone(),
        }))
    }

    fn extract_attachment_refs(&self, rendered_detail: &str) -> Result<Vec<AttachmentRef>> {
        let document = Html::parse_document(rendered_detail);
        let link_sel = Self::parse_selector(&self.selectors.attachment_link)?;

        Ok(document.select(&link_sel).filter_map(|el| self.classify_attachment(&el)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIST_HTML: &str = r#"
        <table class="board_list"><tbody>
            <tr>
                <td class="title"><a href="/board/view.do?id=101">2025년 공고 제1호</a></td>
                <td class="date">2025-01-10</td>
            </tr>
            <tr>
                <td class="title"><a href="/board/view.do?id=100">2025년 공고 제2호</a></td>
                <td class="date">2025-01-05</td>
            </tr>
            <tr><td class="title"><a href=""> </a></td><td class="date">x</td></tr>
        </tbody></table>
    "#;

    const DETAIL_HTML: &str = r#"
        <div class="board_view">
            <span class="date">2025년 1월 10일</span>
            <div class="content"><p>본문 내용입니다.</p></div>
        </div>
        <div class="file_list">
            <a onclick="fn_egov_downFile('FILE_000123','0')">공고문.hwp</a>
            <a href="javascript:doDownload(7)">붙임1.pdf</a>
            <a href="/files/notice.zip">notice.zip</a>
            <a href="">  </a>
        </div>
    "#;

    fn adapter() -> BoardAdapter {
        BoardAdapter::new(
            "https://city.example.go.kr",
            "https://city.example.go.kr/board/list.do?page={page}",
            BoardSelectors::default(),
        )
        .unwrap()
        .with_download_call(r"fn_egov_downFile\('[^']*'\s*,\s*'[^']*'\)")
        .unwrap()
    }

    #[test]
    fn test_build_list_url() {
        assert_eq!(
            adapter().build_list_url(3),
            "https://city.example.go.kr/board/list.do?page=3"
        );
    }

    #[test]
    fn test_template_requires_page_placeholder() {
        let result = BoardAdapter::new("https://a.example", "https://a.example/list", BoardSelectors::default());
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }

    #[test]
    fn test_extract_list_items() {
        let items = adapter().extract_list_items(LIST_HTML).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "2025년 공고 제1호");
        assert_eq!(items[0].list_date_text, "2025-01-10");
        assert_eq!(items[0].locator, "https://city.example.go.kr/board/view.do?id=101");
    }

    #[test]
    fn test_extract_list_items_empty_page() {
        let items = adapter().extract_list_items("<html><body>시스템 점검 중</body></html>").unwrap();
        assert!(items.is_empty());
    }

    #[test]
    fn test_attachment_classification() {
        let refs = adapter().extract_attachment_refs(DETAIL_HTML).unwrap();
        assert_eq!(refs.len(), 3);

        assert_eq!(refs[0].strategy, AttachmentStrategy::Structured);
        assert_eq!(refs[0].acquisition_locator, "fn_egov_downFile('FILE_000123','0')");

        assert_eq!(refs[1].strategy, AttachmentStrategy::Interactive);
        assert_eq!(refs[1].acquisition_locator, "doDownload(7)");

        assert_eq!(refs[2].strategy, AttachmentStrategy::DirectLink);
        assert_eq!(refs[2].acquisition_locator, "https://city.example.go.kr/files/notice.zip");
    }

    #[test]
    fn test_invalid_selector_reported() {
        let selectors = BoardSelectors { row: "[[broken".to_string(), ..Default::default() };
        let adapter = BoardAdapter::new("https://a.example", "https://a.example/{page}", selectors).unwrap();
        assert!(matches!(
            adapter.extract_list_items("<html></html>"),
            Err(HarvestError::Selector { .. })
        ));
    }
}
