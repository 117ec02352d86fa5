//! Rendering-session boundary.
//!
//! The engine never talks to a browser directly; it drives a
//! [`RenderSession`], which owns one rendering context for the whole run.
//! Navigation, script execution, and download capture are all bounded by
//! timeouts so no suspension point blocks indefinitely.
//!
//! [`BrowserlessSession`] is the production implementation, speaking to a
//! Browserless-style HTTP service: `/content` returns fully rendered HTML
//! for a URL, `/function` executes a script payload in the page context, and
//! `/pressure` answers liveness checks. Tests substitute an in-memory
//! session instead.

use crate::{HarvestError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, warn};

/// How a download is set in motion.
#[derive(Debug, Clone, Copy)]
pub enum DownloadTrigger<'a> {
    /// A script payload executed in the page context: either the site's
    /// native download call with its original parameters, or a captured
    /// onclick body replayed verbatim.
    Script(&'a str),
    /// A resolved URL opened directly.
    Url(&'a str),
}

/// A completed transfer captured by the session.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// File name suggested by the server (Content-Disposition or the
    /// script's own report); the caller sanitizes before writing.
    pub suggested_name: Option<String>,
    /// Raw file bytes.
    pub bytes: Vec<u8>,
}

/// One rendering-engine session, owned exclusively by the running engine.
///
/// Loss of the session (a failed [`RenderSession::is_alive`] probe) triggers
/// [`RenderSession::restart`] before, never during, a navigation attempt.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigates to a URL and renders it. The rendered HTML is available
    /// from [`RenderSession::content`] until the next navigation.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Rendered HTML of the current page.
    async fn content(&mut self) -> Result<String>;

    /// Fires a download trigger and waits (bounded) for the transfer to
    /// complete.
    async fn download(&mut self, trigger: DownloadTrigger<'_>, wait: Duration) -> Result<DownloadedFile>;

    /// Liveness probe. `false` means the session must be restarted before
    /// the next navigation.
    async fn is_alive(&mut self) -> bool;

    /// Tears down and re-establishes the session.
    async fn restart(&mut self) -> Result<()>;
}

/// Production session backed by a Browserless-style rendering service.
pub struct BrowserlessSession {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    current_url: Option<String>,
    rendered: Option<String>,
    navigation_timeout: Duration,
}

impl BrowserlessSession {
    /// Connects to a rendering service at `base_url`.
    ///
    /// Fails with [`HarvestError::Init`] when the HTTP client cannot be
    /// built; the caller treats that as fatal for the run.
    pub fn new(base_url: &str, token: Option<&str>, navigation_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(navigation_timeout)
            .build()
            .map_err(|e| HarvestError::Init(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.map(String::from),
            current_url: None,
            rendered: None,
            navigation_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        match &self.token {
            Some(token) => format!("{}/{}?token={}", self.base_url, path, token),
            None => format!("{}/{}", self.base_url, path),
        }
    }

    async fn render(&self, url: &str) -> Result<String> {
        let body = serde_json::json!({ "url": url });
        let resp = self
            .client
            .post(self.endpoint("content"))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HarvestError::Render(format!("content returned {}: {}", status, message)));
        }

        Ok(resp.text().await?)
    }

    /// Runs a script payload through `/function`, returning the raw
    /// response body.
    ///
    /// `wait` bounds this single request; it overrides the client-wide
    /// navigation timeout so a long download wait is actually honored.
    async fn run_function(&self, script: &str, wait: Duration) -> Result<Vec<u8>> {
        let context = serde_json::json!({ "url": self.current_url });
        let body = serde_json::json!({ "code": script, "context": context });
        let resp = self
            .client
            .post(self.endpoint("function"))
            .header("Content-Type", "application/json")
            .json(&body)
            .timeout(wait)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(HarvestError::Render(format!("function returned {}: {}", status, message)));
        }

        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl RenderSession for BrowserlessSession {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        debug!(url, "navigating");
        let html = self.render(url).await?;
        self.current_url = Some(url.to_string());
        self.rendered = Some(html);
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.rendered
            .clone()
            .ok_or_else(|| HarvestError::Render("no page rendered yet".to_string()))
    }

    async fn download(&mut self, trigger: DownloadTrigger<'_>, wait: Duration) -> Result<DownloadedFile> {
        let operation = match trigger {
            DownloadTrigger::Url(url) => {
                debug!(url, "direct download");
                let request = self.client.get(url).timeout(wait).send();
                let resp = request.await?;
                let status = resp.status();
                if !status.is_success() {
                    return Err(HarvestError::Render(format!("download returned {}", status)));
                }
                let suggested_name = file_name_from_headers(resp.headers());
                let bytes = resp.bytes().await?.to_vec();
                return Ok(DownloadedFile { suggested_name, bytes });
            }
            DownloadTrigger::Script(script) => self.run_function(script, wait),
        };

        let bytes = tokio::time::timeout(wait, operation).await.map_err(|_| HarvestError::Timeout {
            operation: "download".to_string(),
            timeout_secs: wait.as_secs(),
        })??;

        if bytes.is_empty() {
            return Err(HarvestError::Render("download produced no data".to_string()));
        }
        Ok(DownloadedFile { suggested_name: None, bytes })
    }

    async fn is_alive(&mut self) -> bool {
        match self.client.get(self.endpoint("pressure")).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                warn!(error = %e, "liveness probe failed");
                false
            }
        }
    }

    async fn restart(&mut self) -> Result<()> {
        debug!("restarting rendering session");
        self.client = reqwest::Client::builder()
            .timeout(self.navigation_timeout)
            .build()
            .map_err(|e| HarvestError::SessionLost(e.to_string()))?;
        self.rendered = None;

        if !self.is_alive().await {
            return Err(HarvestError::SessionLost("service unreachable after restart".to_string()));
        }
        Ok(())
    }
}

/// Pulls a file name out of a Content-Disposition header when present.
pub(crate) fn file_name_from_headers(headers: &reqwest::header::HeaderMap) -> Option<String> {
    let value = headers.get(reqwest::header::CONTENT_DISPOSITION)?.to_str().ok()?;
    file_name_from_disposition(value)
}

/// Parses the `filename=` parameter of a Content-Disposition value.
pub(crate) fn file_name_from_disposition(value: &str) -> Option<String> {
    let marker = "filename=";
    let idx = value.find(marker)?;
    let name = value[idx + marker.len()..].trim().trim_matches('"').trim_matches('\'');
    let name = name.split(';').next().unwrap_or(name).trim();
    if name.is_empty() { None } else { Some(name.to_string()) }
}
