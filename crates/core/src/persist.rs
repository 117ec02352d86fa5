//! On-disk persistence of harvested announcements.
//!
//! Layout: `outputRoot/siteCode/NNN_<sanitizedTitle>/content.md` plus an
//! `attachments/` subfolder. `NNN` is a zero-padded three-digit sequence,
//! strictly increasing and never reused within a site directory.
//!
//! Writes are two-phase: [`PersistenceWriter::prepare`] allocates the folder
//! (and `attachments/`) so acquisition can stream files into it, and
//! [`PersistenceWriter::finalize`] writes `content.md`. The engine only
//! advances the sequence counter and records the dedup title after finalize
//! succeeds.

use crate::model::{Announcement, AttachmentOutcome, DetailContent};
use crate::sanitize::sanitize_title;
use crate::{HarvestError, Result};
use std::fs;
use std::path::PathBuf;

/// A folder allocated for one announcement, awaiting its content file.
#[derive(Debug)]
pub struct PendingEntry {
    /// Sequence number the folder was allocated under.
    pub sequence: u32,
    /// The announcement folder.
    pub dir: PathBuf,
    /// The `attachments/` subfolder, already created.
    pub attachments_dir: PathBuf,
}

/// Writes announcement folders under one site directory.
#[derive(Debug)]
pub struct PersistenceWriter {
    site_dir: PathBuf,
    truncate: usize,
}

impl PersistenceWriter {
    pub fn new(site_dir: impl Into<PathBuf>, truncate: usize) -> Self {
        Self { site_dir: site_dir.into(), truncate }
    }

    /// Creates the site directory if needed.
    pub fn ensure_site_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.site_dir).map_err(|_| HarvestError::OutputDir(self.site_dir.clone()))?;
        Ok(())
    }

    /// Allocates the folder for one announcement and its `attachments/`
    /// subfolder.
    pub fn prepare(&self, sequence: u32, title: &str) -> Result<PendingEntry> {
        let fragment = sanitize_title(title, self.truncate);
        let dir = self.site_dir.join(format!("{:03}_{}", sequence, fragment));
        let attachments_dir = dir.join("attachments");
        fs::create_dir_all(&attachments_dir)?;
        Ok(PendingEntry { sequence, dir, attachments_dir })
    }

    /// Removes a prepared folder whose announcement will not be persisted,
    /// including anything acquisition already streamed into it.
    ///
    /// An abandoned folder must not survive: its prefix would be reused by
    /// the next item in the run, and the next run's resume scan would read
    /// its fragment as an already-persisted title.
    pub fn discard(&self, entry: &PendingEntry) {
        if let Err(e) = fs::remove_dir_all(&entry.dir) {
            tracing::warn!(dir = %entry.dir.display(), error = %e, "abandoned folder not removed");
        }
    }

    /// Writes `content.md` with the fixed section order: title, source URL,
    /// resolved date, body, attachment listing.
    pub fn finalize(
        &self,
        entry: &PendingEntry,
        announcement: &Announcement,
        detail: &DetailContent,
        outcomes: &[AttachmentOutcome],
    ) -> Result<()> {
        let content = render_content(announcement, detail, outcomes);
        fs::write(entry.dir.join("content.md"), content)?;
        Ok(())
    }
}

fn render_content(announcement: &Announcement, detail: &DetailContent, outcomes: &[AttachmentOutcome]) -> String {
    let mut out = String::new();

    out.push_str(&format!("# {}\n\n", announcement.title.trim()));
    out.push_str(&format!("- Source: {}\n", detail.source_url));
    if let Some(date) = detail.resolved_date {
        out.push_str(&format!("- Date: {}\n", date.format("%Y-%m-%d")));
    }
    out.push('\n');

    let body = htmd::convert(&detail.body_html).unwrap_or_else(|_| detail.body_html.clone());
    out.push_str(body.trim());
    out.push_str("\n\n## Attachments\n\n");

    if outcomes.is_empty() {
        out.push_str("(none)\n");
        return out;
    }

    for outcome in outcomes {
        match outcome {
            AttachmentOutcome::Saved(saved) => {
                out.push_str(&format!("- {}: {}\n", saved.file_name, saved.locator));
            }
            AttachmentOutcome::Unresolved { display_name, reason } => {
                out.push_str(&format!("- {}: unresolved ({})\n", display_name, reason));
            }
        }
    }
    out
}
