//! Core data types flowing through the harvest pipeline.
//!
//! An [`Announcement`] is produced per list-page row, consumed by the detail
//! fetcher; a [`DetailContent`] carries the normalized detail view plus its
//! [`AttachmentRef`]s into attachment acquisition and persistence.

use chrono::NaiveDate;
use serde::Serialize;

/// One listed item on a paginated announcement board.
///
/// Immutable once extracted; owned by the current page-processing iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Raw title text from the list view.
    pub title: String,
    /// Raw date text from the list view (may be empty or malformed).
    pub list_date_text: String,
    /// Opaque site-specific reference used to reach the detail view: an id,
    /// an onclick payload, or a URL. Only the site adapter interprets it.
    pub locator: String,
}

/// Which acquisition technique an attachment reference was captured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentStrategy {
    /// The site's native download function with its original parameters.
    Structured,
    /// A captured interaction payload (onclick body) executed verbatim.
    Interactive,
    /// A plain resolvable URL.
    DirectLink,
    /// An explicit HTTP request reproducing what the structured trigger
    /// would have sent.
    HttpReplay,
}

/// Reference to one attachment on a detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Display name as shown on the page.
    pub display_name: String,
    /// Strategy-specific payload: function-call parameters, an href, or an
    /// onclick body.
    pub acquisition_locator: String,
    /// The strategy the locator was captured for. The acquisition engine
    /// starts its fallback chain here.
    pub strategy: AttachmentStrategy,
}

/// Normalized content of one announcement's detail view.
#[derive(Debug, Clone)]
pub struct DetailContent {
    /// Body HTML extracted from the detail view.
    pub body_html: String,
    /// Raw date text surfaced by the adapter (detail-view date preferred,
    /// list-view text when the detail view carries none).
    pub date_text: String,
    /// Date normalized from `date_text`; absent when unparseable.
    pub resolved_date: Option<NaiveDate>,
    /// Attachment references found on the detail view.
    pub attachments: Vec<AttachmentRef>,
    /// URL the detail view was fetched from.
    pub source_url: String,
}

/// A successfully saved attachment.
#[derive(Debug, Clone, Serialize)]
pub struct SavedAttachment {
    /// Sanitized file name as written under `attachments/`.
    pub file_name: String,
    /// The locator that actually produced the file (differs from the
    /// captured locator when a fallback strategy won).
    pub locator: String,
    /// The strategy that succeeded.
    pub strategy: AttachmentStrategy,
}

/// Outcome of running the fallback chain for one attachment reference.
#[derive(Debug, Clone, Serialize)]
pub enum AttachmentOutcome {
    /// A strategy produced a file on disk.
    Saved(SavedAttachment),
    /// Every strategy failed; the announcement is still persisted with the
    /// reference marked unresolved.
    Unresolved {
        display_name: String,
        reason: String,
    },
}

impl AttachmentOutcome {
    /// Display name regardless of outcome, for the content-file listing.
    pub fn display_name(&self) -> &str {
        match self {
            AttachmentOutcome::Saved(saved) => &saved.file_name,
            AttachmentOutcome::Unresolved { display_name, .. } => display_name,
        }
    }

    pub fn is_saved(&self) -> bool {
        matches!(self, AttachmentOutcome::Saved(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_display_name() {
        let saved = AttachmentOutcome::Saved(SavedAttachment {
            file_name: "공고문.hwp".to_string(),
            locator: "https://example.com/f/1".to_string(),
            strategy: AttachmentStrategy::DirectLink,
        });
        assert_eq!(saved.display_name(), "공고문.hwp");
        assert!(saved.is_saved());

        let missing = AttachmentOutcome::Unresolved {
            display_name: "붙임1.pdf".to_string(),
            reason: "all strategies exhausted".to_string(),
        };
        assert_eq!(missing.display_name(), "붙임1.pdf");
        assert!(!missing.is_saved());
    }

    #[test]
    fn test_strategy_serializes_snake_case() {
        let json = serde_json::to_string(&AttachmentStrategy::HttpReplay).unwrap();
        assert_eq!(json, "\"http_replay\"");
    }
}
