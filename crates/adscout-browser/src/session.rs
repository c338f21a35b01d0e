//! The page-session seam between extraction logic and a concrete browser.
//!
//! Extraction code (consent, snapshot, profile) only ever talks to a
//! [`PageSession`]; the Chrome implementation lives in [`crate::chrome`] and
//! tests drive the same code with scripted sessions.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::BrowserError;

/// Opaque handle to one frame of the current document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrameRef(pub String);

impl FrameRef {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One browser tab that can be navigated and scripted.
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigates to `url`, giving up after `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// URL of the current document, if any.
    async fn current_url(&self) -> Option<String>;

    /// Every frame of the current document, main frame first.
    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError>;

    /// Evaluates `script` as an expression inside `frame` and returns its
    /// JSON value. Promises are awaited. `undefined` becomes `null`.
    async fn evaluate_in(
        &self,
        frame: &FrameRef,
        script: &str,
    ) -> Result<serde_json::Value, BrowserError>;

    /// Sends an Escape key press to the focused element.
    async fn press_escape(&self) -> Result<(), BrowserError>;

    /// Evaluates `script` in the main frame.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, BrowserError> {
        let frames = self.frames().await?;
        let main = frames
            .first()
            .ok_or_else(|| BrowserError::Script("page has no frames".to_owned()))?;
        self.evaluate_in(main, script).await
    }
}
