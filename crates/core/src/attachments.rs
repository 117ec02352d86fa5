//! Attachment acquisition.
//!
//! Every attachment reference runs through an ordered fallback chain until
//! one strategy produces a file or all fail:
//!
//! 1. Structured trigger: the site's native download call with its original
//!    parameters, through the rendering session, long bounded wait.
//! 2. Interactive trigger: the captured interaction payload executed
//!    verbatim, shorter bounded wait.
//! 3. Direct link: the resolved URL opened through the session.
//! 4. HTTP replay: an explicit request reproducing what the trigger would
//!    have sent, streamed straight to disk with no completion signal.
//!
//! Strategy failures are non-fatal; an exhausted chain records the reference
//! as unresolved and the owning announcement is still persisted. Bytes only
//! touch disk on success, so a failed strategy never leaves a file behind.

use crate::config::HarvestConfig;
use crate::model::{AttachmentOutcome, AttachmentRef, AttachmentStrategy, SavedAttachment};
use crate::sanitize::sanitize_file_name;
use crate::session::{DownloadTrigger, DownloadedFile, RenderSession};
use crate::{HarvestError, Result};
use futures::StreamExt;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum length for saved attachment file names.
const MAX_FILE_NAME: usize = 120;

fn url_in_payload_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^'"()\s]+"#).unwrap())
}

/// Runs the fallback chain for each reference of one announcement.
pub struct AcquisitionEngine {
    client: reqwest::Client,
    download_wait: Duration,
    short_wait: Duration,
}

impl AcquisitionEngine {
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.download_wait)
            .build()
            .map_err(|e| HarvestError::Init(e.to_string()))?;

        Ok(Self { client, download_wait: config.download_wait, short_wait: config.short_download_wait })
    }

    /// Acquires all attachments of one announcement into `dest_dir`.
    ///
    /// `dest_dir` must already exist. Outcomes come back in reference order;
    /// unresolved entries carry the reason from the last strategy tried.
    pub async fn acquire_all(
        &self,
        session: &mut dyn RenderSession,
        refs: &[AttachmentRef],
        dest_dir: &Path,
    ) -> Vec<AttachmentOutcome> {
        let mut outcomes = Vec::with_capacity(refs.len());
        let mut used_names = HashSet::new();

        for attachment in refs {
            outcomes.push(self.acquire_one(session, attachment, dest_dir, &mut used_names).await);
        }
        outcomes
    }

    async fn acquire_one(
        &self,
        session: &mut dyn RenderSession,
        attachment: &AttachmentRef,
        dest_dir: &Path,
        used_names: &mut HashSet<String>,
    ) -> AttachmentOutcome {
        let mut last_error = String::from("no applicable strategy");

        for (strategy, locator) in strategy_chain(attachment) {
            let result = match strategy {
                AttachmentStrategy::Structured => {
                    session.download(DownloadTrigger::Script(&locator), self.download_wait).await
                }
                AttachmentStrategy::Interactive => {
                    session.download(DownloadTrigger::Script(&locator), self.short_wait).await
                }
                AttachmentStrategy::DirectLink => {
                    session.download(DownloadTrigger::Url(&locator), self.short_wait).await
                }
                AttachmentStrategy::HttpReplay => self.replay_to_disk(&locator, attachment, dest_dir, used_names).await,
            };

            match result {
                Ok(file) => {
                    // HTTP replay already streamed to disk and reports the
                    // final name through `suggested_name`.
                    let written = if strategy == AttachmentStrategy::HttpReplay {
                        file.suggested_name.clone().map(Ok).unwrap_or_else(|| {
                            write_bytes(dest_dir, attachment, &file, used_names)
                        })
                    } else {
                        write_bytes(dest_dir, attachment, &file, used_names)
                    };

                    match written {
                        Ok(file_name) => {
                            debug!(name = %file_name, ?strategy, "attachment saved");
                            return AttachmentOutcome::Saved(SavedAttachment { file_name, locator, strategy });
                        }
                        Err(e) => last_error = format!("{:?}: write failed: {}", strategy, e),
                    }
                }
                Err(e) => {
                    debug!(name = %attachment.display_name, ?strategy, error = %e, "strategy failed");
                    last_error = format!("{:?}: {}", strategy, e);
                }
            }
        }

        warn!(name = %attachment.display_name, reason = %last_error, "attachment unresolved");
        AttachmentOutcome::Unresolved { display_name: attachment.display_name.clone(), reason: last_error }
    }

    /// Strategy 4: explicit HTTP request streamed straight to disk.
    ///
    /// Streams to a `.part` file and renames on completion; a failed
    /// transfer removes the partial file.
    async fn replay_to_disk(
        &self,
        url: &str,
        attachment: &AttachmentRef,
        dest_dir: &Path,
        used_names: &mut HashSet<String>,
    ) -> Result<DownloadedFile> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HarvestError::Render(format!("replay returned {}", status)));
        }

        let header_name = resp
            .headers()
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(crate::session::file_name_from_disposition);
        let file_name = unique_name(
            header_name.as_deref().unwrap_or(&attachment.display_name),
            used_names,
        );
        let final_path = dest_dir.join(&file_name);
        let part_path = part_path(&final_path);

        // Every failure past this point must discard the partial file and
        // release the reserved name, or a failed strategy leaves residue.
        match stream_to_disk(resp, &part_path, &final_path).await {
            Ok(()) => Ok(DownloadedFile { suggested_name: Some(file_name), bytes: Vec::new() }),
            Err(e) => {
                discard_partial(&part_path, &file_name, used_names).await;
                Err(e)
            }
        }
    }
}

/// Streams a response body to `part_path`, renaming to `final_path` once the
/// transfer completed with at least one byte.
async fn stream_to_disk(resp: reqwest::Response, part_path: &Path, final_path: &Path) -> Result<()> {
    let mut file = tokio::fs::File::create(part_path).await?;
    let mut stream = resp.bytes_stream();
    let mut wrote_any = false;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        tokio::io::AsyncWriteExt::write_all(&mut file, &chunk).await?;
        wrote_any = true;
    }
    tokio::io::AsyncWriteExt::flush(&mut file).await?;
    drop(file);

    if !wrote_any {
        return Err(HarvestError::Render("replay produced no data".to_string()));
    }

    tokio::fs::rename(part_path, final_path).await?;
    Ok(())
}

/// Removes a leftover `.part` file and releases its reserved name.
async fn discard_partial(part_path: &Path, file_name: &str, used_names: &mut HashSet<String>) {
    if let Err(e) = tokio::fs::remove_file(part_path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %part_path.display(), error = %e, "partial file not removed");
        }
    }
    used_names.remove(file_name);
}

/// Builds the applicable (strategy, locator) chain for one reference.
///
/// The chain always runs in fixed order; entries whose locator shape cannot
/// serve a strategy are skipped. HTTP replay needs a URL, recovered either
/// from the locator itself or from inside a script payload.
fn strategy_chain(attachment: &AttachmentRef) -> Vec<(AttachmentStrategy, String)> {
    let locator = attachment.acquisition_locator.clone();
    let mut chain = Vec::new();

    if attachment.strategy == AttachmentStrategy::Structured {
        chain.push((AttachmentStrategy::Structured, locator.clone()));
    }
    if !locator.starts_with("http://") && !locator.starts_with("https://") {
        chain.push((AttachmentStrategy::Interactive, locator.clone()));
    }
    if let Some(url) = extract_url(&locator) {
        chain.push((AttachmentStrategy::DirectLink, url.clone()));
        chain.push((AttachmentStrategy::HttpReplay, url));
    }

    chain
}

/// Recovers a usable URL from a locator: the locator itself when it is one,
/// otherwise the first http(s) URL embedded in the payload.
fn extract_url(locator: &str) -> Option<String> {
    if locator.starts_with("http://") || locator.starts_with("https://") {
        return Some(locator.to_string());
    }
    url_in_payload_re().find(locator).map(|m| m.as_str().to_string())
}

/// Writes captured bytes under a collision-free sanitized name.
fn write_bytes(
    dest_dir: &Path,
    attachment: &AttachmentRef,
    file: &DownloadedFile,
    used_names: &mut HashSet<String>,
) -> std::io::Result<String> {
    let raw_name = file.suggested_name.as_deref().unwrap_or(&attachment.display_name);
    let file_name = unique_name(raw_name, used_names);
    std::fs::write(dest_dir.join(&file_name), &file.bytes)?;
    Ok(file_name)
}

fn unique_name(raw: &str, used_names: &mut HashSet<String>) -> String {
    let base = sanitize_file_name(raw, MAX_FILE_NAME);
    let mut candidate = base.clone();
    let mut counter = 1;
    while used_names.contains(&candidate) {
        candidate = match base.rsplit_once('.') {
            Some((stem, ext)) => format!("{} ({}).{}", stem, counter, ext),
            None => format!("{} ({})", base, counter),
        };
        counter += 1;
    }
    used_names.insert(candidate.clone());
    candidate
}

fn part_path(final_path: &Path) -> PathBuf {
    let mut name = final_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".part");
    final_path.with_file_name(name)
}
