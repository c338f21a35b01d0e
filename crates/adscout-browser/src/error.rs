use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while driving a browser page.
///
/// Only [`BrowserError::ChromeNotFound`] and [`BrowserError::Launch`] are
/// fatal to a run; everything else is contained per ad or per publisher and
/// degrades to empty fields.
#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Chrome/Chromium executable not found; set ADSCOUT_CHROME_PATH")]
    ChromeNotFound,

    #[error("failed to launch browser: {0}")]
    Launch(String),

    /// Protocol-level failure reported by the DevTools connection.
    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    /// A CDP command could not be built from its parameters.
    #[error("invalid CDP parameters for {command}: {reason}")]
    Params {
        command: &'static str,
        reason: String,
    },

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{step} timed out after {after_ms}ms")]
    Timeout { step: &'static str, after_ms: u64 },

    #[error("script evaluation failed: {0}")]
    Script(String),

    #[error("storage state I/O error at {path}: {source}")]
    StorageIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage state at {path} is not valid JSON: {source}")]
    StorageJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
