//! Scripted [`PageSession`] for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::BrowserError;
use crate::session::{FrameRef, PageSession};

type Responder = Box<dyn Fn(&str, &FrameRef, &str) -> Result<Value, BrowserError> + Send + Sync>;

pub(crate) struct ScriptedSession {
    url: Mutex<Option<String>>,
    frames: Vec<FrameRef>,
    responder: Responder,
    pub visited: Mutex<Vec<String>>,
    pub evaluations: AtomicUsize,
    pub escapes: AtomicUsize,
    pub eval_delay: Option<Duration>,
    pub fail_goto: bool,
}

impl ScriptedSession {
    /// `responder` receives the current URL, the frame and the script.
    pub fn new<F>(frame_count: usize, responder: F) -> Self
    where
        F: Fn(&str, &FrameRef, &str) -> Result<Value, BrowserError> + Send + Sync + 'static,
    {
        Self {
            url: Mutex::new(None),
            frames: (0..frame_count.max(1))
                .map(|i| FrameRef(format!("frame-{i}")))
                .collect(),
            responder: Box::new(responder),
            visited: Mutex::new(Vec::new()),
            evaluations: AtomicUsize::new(0),
            escapes: AtomicUsize::new(0),
            eval_delay: None,
            fail_goto: false,
        }
    }

    pub fn at(self, url: &str) -> Self {
        *self.url.lock().unwrap() = Some(url.to_owned());
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSession for ScriptedSession {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), BrowserError> {
        self.visited.lock().unwrap().push(url.to_owned());
        if self.fail_goto {
            return Err(BrowserError::Navigation {
                url: url.to_owned(),
                reason: "scripted failure".to_owned(),
            });
        }
        *self.url.lock().unwrap() = Some(url.to_owned());
        Ok(())
    }

    async fn current_url(&self) -> Option<String> {
        self.url.lock().unwrap().clone()
    }

    async fn frames(&self) -> Result<Vec<FrameRef>, BrowserError> {
        Ok(self.frames.clone())
    }

    async fn evaluate_in(&self, frame: &FrameRef, script: &str) -> Result<Value, BrowserError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.eval_delay {
            tokio::time::sleep(delay).await;
        }
        let url = self.url.lock().unwrap().clone().unwrap_or_default();
        (self.responder)(&url, frame, script)
    }

    async fn press_escape(&self) -> Result<(), BrowserError> {
        self.escapes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
