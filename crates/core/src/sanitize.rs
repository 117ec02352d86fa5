//! Filesystem-safe name handling shared by the dedup store and the
//! persistence writer.
//!
//! Folder names and dedup keys must be derived the same way or resumed runs
//! stop recognizing their own output; both go through [`sanitize_title`].

/// Default truncation length for sanitized titles.
///
/// Two distinct titles sharing the same prefix at this length collide and are
/// treated as duplicates; callers who need finer discrimination can raise the
/// limit via `HarvestConfig::title_truncate`.
pub const DEFAULT_TITLE_TRUNCATE: usize = 100;

/// Characters that are unsafe in folder and file names on common filesystems.
const FORBIDDEN: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|', '\0'];

/// Sanitizes a title for use as a folder-name fragment and dedup key.
///
/// Strips path-hostile characters, collapses whitespace runs to single
/// spaces, trims, and truncates to `max_len` characters (by char count, so
/// multi-byte text is never split mid-character).
///
/// # Example
///
/// ```rust
/// use gosi_core::sanitize::sanitize_title;
///
/// assert_eq!(sanitize_title("2025년  입찰/공고   안내", 100), "2025년 입찰공고 안내");
/// ```
pub fn sanitize_title(raw: &str, max_len: usize) -> String {
    let stripped: String = raw.chars().filter(|c| !FORBIDDEN.contains(c) && !c.is_control()).collect();

    let collapsed = collapse_whitespace(&stripped);
    collapsed.chars().take(max_len).collect::<String>().trim_end().to_string()
}

/// Sanitizes a downloaded attachment file name.
///
/// Same character rules as titles but keeps the extension intact when
/// truncation is needed.
pub fn sanitize_file_name(raw: &str, max_len: usize) -> String {
    let cleaned = sanitize_title(raw, usize::MAX);
    if cleaned.chars().count() <= max_len {
        return fallback_if_empty(cleaned);
    }

    match cleaned.rsplit_once('.') {
        Some((stem, ext)) if !ext.is_empty() && ext.chars().count() < max_len => {
            let keep = max_len - ext.chars().count() - 1;
            let stem: String = stem.chars().take(keep).collect();
            fallback_if_empty(format!("{}.{}", stem.trim_end(), ext))
        }
        _ => fallback_if_empty(cleaned.chars().take(max_len).collect::<String>().trim_end().to_string()),
    }
}

fn fallback_if_empty(name: String) -> String {
    if name.is_empty() { "attachment".to_string() } else { name }
}

fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for c in s.trim().chars() {
        if c.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(c);
            in_ws = false;
        }
    }
    out
}
