//! Error types for harvest operations.
//!
//! This module defines the main error type [`HarvestError`] which represents
//! all possible errors that can occur during list pagination, detail
//! fetching, attachment acquisition, and persistence.
//!
//! Per-item and per-page failures are handled inside the engine (retried,
//! skipped, or counted against the error budget) and never surface through
//! this type; a [`HarvestError`] reaching the caller means the run itself
//! could not start or continue.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for harvest engine operations.
///
/// # Example
///
/// ```rust
/// use gosi_core::{HarvestError, Result};
///
/// fn check_site_code(code: &str) -> Result<()> {
///     if code.is_empty() {
///         return Err(HarvestError::Config("site code must not be empty".into()));
///     }
///     Ok(())
/// }
/// ```
#[derive(Error, Debug)]
pub enum HarvestError {
    /// HTTP request errors from reqwest.
    ///
    /// Wraps network errors, DNS failures, connection issues, and other
    /// HTTP-related problems.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// An operation exceeded its configured timeout.
    #[error("Operation timed out after {timeout_secs} seconds: {operation}")]
    Timeout { operation: String, timeout_secs: u64 },

    /// Invalid URL provided or constructed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The rendering session returned an error or unusable content.
    #[error("Render failed: {0}")]
    Render(String),

    /// A CSS selector failed to parse.
    #[error("Invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    /// The rendering session died and could not be re-established.
    #[error("Rendering session lost and recovery failed: {0}")]
    SessionLost(String),

    /// The rendering session could not be initialized at all.
    ///
    /// This is the only failure that aborts a run before any page is
    /// processed.
    #[error("Failed to initialize rendering session: {0}")]
    Init(String),

    /// Output directory is missing or not writable.
    #[error("Output directory unavailable: {0}")]
    OutputDir(PathBuf),

    /// File write errors.
    #[error("Failed to write to file: {0}")]
    Write(#[from] std::io::Error),

    /// Invalid engine configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for HarvestError.
pub type Result<T> = std::result::Result<T, HarvestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HarvestError::InvalidUrl("not a url".to_string());
        assert!(err.to_string().contains("Invalid URL"));
    }

    #[test]
    fn test_timeout_error() {
        let err = HarvestError::Timeout { operation: "navigate".to_string(), timeout_secs: 30 };
        assert!(err.to_string().contains("30"));
        assert!(err.to_string().contains("navigate"));
    }

    #[test]
    fn test_selector_error() {
        let err = HarvestError::Selector { selector: "[[bad".to_string(), message: "parse error".to_string() };
        assert!(err.to_string().contains("[[bad"));
    }
}
