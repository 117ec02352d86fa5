//! Duplicate tracking across runs.
//!
//! The dedup store is seeded by scanning the per-site output directory for
//! folders named `NNN_<title-fragment>`; each fragment becomes a seen title
//! and the sequence counter resumes one past the highest number found. This
//! makes re-runs against an unchanged board produce zero new folders without
//! any external bookkeeping.
//!
//! Dedup keys are sanitized and truncated titles, so two long titles sharing
//! the same prefix at the truncation length collide. That approximation is
//! accepted; the truncation length is configurable on `HarvestConfig`.

use crate::sanitize::sanitize_title;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Tracks which announcements have already been persisted, keyed by
/// sanitized/truncated title.
#[derive(Debug)]
pub struct DedupStore {
    seen_titles: HashSet<String>,
    next_sequence: u32,
    truncate: usize,
}

impl DedupStore {
    /// Creates an empty store starting at sequence 1.
    pub fn new(truncate: usize) -> Self {
        Self { seen_titles: HashSet::new(), next_sequence: 1, truncate }
    }

    /// Seeds a store by scanning `site_dir` for existing `NNN_<fragment>`
    /// folders.
    ///
    /// A missing directory yields an empty store; unreadable entries are
    /// skipped rather than failing the run.
    pub fn from_output_dir(site_dir: &Path, truncate: usize) -> Self {
        let mut store = Self::new(truncate);
        let Ok(entries) = fs::read_dir(site_dir) else {
            return store;
        };

        let mut max_seq = 0u32;
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some((seq, fragment)) = split_folder_name(name) else { continue };

            max_seq = max_seq.max(seq);
            // Fragments on disk were already sanitized+truncated at write
            // time; re-normalizing keeps older output readable even if the
            // configured truncation shrank since.
            store.seen_titles.insert(sanitize_title(fragment, truncate));
        }

        store.next_sequence = max_seq + 1;
        store
    }

    /// Whether an announcement with this (raw) title was already persisted.
    pub fn contains(&self, title: &str) -> bool {
        self.seen_titles.contains(&self.key(title))
    }

    /// Records a title as persisted. Called only after a successful write.
    pub fn record(&mut self, title: &str) {
        self.seen_titles.insert(self.key(title));
    }

    /// Dedup key for a raw title.
    pub fn key(&self, title: &str) -> String {
        sanitize_title(title, self.truncate)
    }

    /// Next unused sequence number. Strictly increasing, never reused.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Advances the sequence counter after a successful write.
    pub fn advance_sequence(&mut self) {
        self.next_sequence += 1;
    }

    /// Number of titles currently tracked.
    pub fn len(&self) -> usize {
        self.seen_titles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen_titles.is_empty()
    }
}

/// Splits `NNN_<fragment>` into its sequence number and title fragment.
///
/// Only 3-digit zero-padded prefixes count; anything else in the directory
/// is ignored by the scan.
fn split_folder_name(name: &str) -> Option<(u32, &str)> {
    let (prefix, fragment) = name.split_once('_')?;
    if prefix.len() != 3 || !prefix.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((prefix.parse().ok()?, fragment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_empty_dir_starts_at_one() {
        let dir = TempDir::new().unwrap();
        let store = DedupStore::from_output_dir(dir.path(), 100);
        assert_eq!(store.next_sequence(), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_missing_dir_starts_at_one() {
        let store = DedupStore::from_output_dir(Path::new("/nonexistent/gosi"), 100);
        assert_eq!(store.next_sequence(), 1);
    }

    #[test]
    fn test_scan_recovers_titles_and_sequence() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("001_첫번째 공고")).unwrap();
        fs::create_dir(dir.path().join("007_두번째 공고")).unwrap();
        fs::create_dir(dir.path().join("notes")).unwrap(); // ignored
        fs::write(dir.path().join("003_파일이라무시"), b"x").unwrap(); // file, ignored

        let store = DedupStore::from_output_dir(dir.path(), 100);
        assert_eq!(store.next_sequence(), 8);
        assert!(store.contains("첫번째 공고"));
        assert!(store.contains("두번째 공고"));
        assert!(!store.contains("세번째 공고"));
    }

    #[test]
    fn test_contains_normalizes_like_folder_names() {
        let mut store = DedupStore::new(100);
        store.record("입찰/공고:  테스트");
        assert!(store.contains("입찰공고 테스트"));
    }

    #[test]
    fn test_truncated_prefix_collision() {
        let mut store = DedupStore::new(10);
        store.record("aaaaaaaaaa-first");
        // Shares the 10-char prefix: treated as a duplicate by design.
        assert!(store.contains("aaaaaaaaaa-second"));
    }

    #[test]
    fn test_split_folder_name() {
        assert_eq!(split_folder_name("012_hello"), Some((12, "hello")));
        assert_eq!(split_folder_name("1_hello"), None);
        assert_eq!(split_folder_name("abc_hello"), None);
        assert_eq!(split_folder_name("nounderscorehere"), None);
    }

    #[test]
    fn test_sequence_advance() {
        let mut store = DedupStore::new(100);
        assert_eq!(store.next_sequence(), 1);
        store.advance_sequence();
        store.advance_sequence();
        assert_eq!(store.next_sequence(), 3);
    }
}
