//! Best-effort dismissal of cookie and consent overlays.
//!
//! The heuristic is language-agnostic: it looks for interactive elements
//! whose text or aria-label reads like "accept" (with a Dutch fallback),
//! in the main frame and then in every embedded frame, and clicks the first
//! hit. Failing that, it clicks the first button of any open dialog. It never
//! errors; the caller only learns whether a click happened before the budget
//! ran out.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::session::{FrameRef, PageSession};

/// Selectors probed for accept buttons, most specific first.
pub const CANDIDATE_SELECTORS: &[&str] = &[
    "button[aria-label*=\"cookie\" i]",
    "[role=\"dialog\"] button",
    "[data-testid*=\"consent\" i] button",
    "button[type=\"submit\"]",
    "button",
    "[role=\"button\"]",
];

/// Case-insensitive patterns an element's label must match to be clicked.
pub const ACCEPT_PATTERNS: &[&str] = &[
    "(accept|allow|agree|consent|continue|ok|proceed|enable)",
    "(alles|alle|toestaan|accepteren|aanvaarden)",
];

/// Candidates inspected per selector.
const MAX_CANDIDATES_PER_SELECTOR: usize = 8;

/// Upper bound for one frame's whole scan, including the click itself.
pub const FRAME_SCAN_TIMEOUT: Duration = Duration::from_millis(600);

/// Pause between full passes over the frames.
pub const POLL_INTERVAL: Duration = Duration::from_millis(80);

const CONSENT_JS: &str = r#"((selectors, patterns, limit) => {
  const res = patterns.map((p) => new RegExp(p, 'i'));
  for (const sel of selectors) {
    let nodes = [];
    try { nodes = Array.from(document.querySelectorAll(sel)).slice(0, limit); } catch (e) { continue; }
    for (const el of nodes) {
      const text = ((el.innerText || '').trim()) || el.getAttribute('aria-label') || '';
      if (text && res.some((re) => re.test(text))) { el.click(); return 'matched'; }
    }
  }
  const dialog = document.querySelector('[role="dialog"]');
  if (dialog) {
    const btn = dialog.querySelector('button');
    if (btn) { btn.click(); return 'dialog'; }
  }
  return '';
})"#;

/// Builds the find-and-click expression evaluated in each frame. It returns
/// `"matched"`, `"dialog"` or an empty string when nothing was clicked.
#[must_use]
pub fn consent_script() -> String {
    let selectors = serde_json::to_string(CANDIDATE_SELECTORS).unwrap_or_else(|_| "[]".into());
    let patterns = serde_json::to_string(ACCEPT_PATTERNS).unwrap_or_else(|_| "[]".into());
    format!("{CONSENT_JS}({selectors}, {patterns}, {MAX_CANDIDATES_PER_SELECTOR})")
}

/// Hosts on which a consent click already succeeded during this run.
#[derive(Debug, Default)]
pub struct ConsentCache {
    hosts: Mutex<HashSet<String>>,
}

impl ConsentCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, host: &str) -> bool {
        self.hosts
            .lock()
            .map(|hosts| hosts.contains(host))
            .unwrap_or(false)
    }

    pub fn insert(&self, host: &str) {
        if let Ok(mut hosts) = self.hosts.lock() {
            hosts.insert(host.to_owned());
        }
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.hosts.lock().map(|hosts| hosts.is_empty()).unwrap_or(true)
    }
}

/// Cache key for a page URL: the host with a leading `www.` removed.
#[must_use]
pub fn host_key(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_owned())
}

/// Tries to dismiss a consent overlay on the session's current page within
/// `budget`. Returns `true` if the host was already handled or a click
/// succeeded, `false` once the deadline passes.
pub async fn ensure_consent<S>(session: &S, cache: &ConsentCache, budget: Duration) -> bool
where
    S: PageSession + ?Sized,
{
    let host = match session.current_url().await {
        Some(url) => host_key(&url),
        None => None,
    };
    if let Some(host) = host.as_deref() {
        if cache.contains(host) {
            return true;
        }
    }

    let script = consent_script();
    let deadline = Instant::now() + budget;

    while Instant::now() < deadline {
        let frames = session.frames().await.unwrap_or_default();
        for frame in &frames {
            if try_frame(session, frame, &script).await {
                if let Some(host) = host.as_deref() {
                    cache.insert(host);
                }
                tracing::debug!(host = host.as_deref().unwrap_or("-"), "consent overlay dismissed");
                return true;
            }
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }

    tracing::debug!(host = host.as_deref().unwrap_or("-"), "no consent overlay dismissed");
    false
}

async fn try_frame<S>(session: &S, frame: &FrameRef, script: &str) -> bool
where
    S: PageSession + ?Sized,
{
    match tokio::time::timeout(FRAME_SCAN_TIMEOUT, session.evaluate_in(frame, script)).await {
        Ok(Ok(serde_json::Value::String(outcome))) => !outcome.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::Value;

    use super::*;
    use crate::error::BrowserError;
    use crate::testing::ScriptedSession;

    #[test]
    fn host_key_strips_www() {
        assert_eq!(
            host_key("https://www.facebook.com/ads/archive/render_ad/?id=1").as_deref(),
            Some("facebook.com")
        );
        assert_eq!(
            host_key("https://mbasic.facebook.com/profile.php").as_deref(),
            Some("mbasic.facebook.com")
        );
        assert!(host_key("about:blank").is_none());
    }

    #[test]
    fn script_keeps_quoted_dialog_selector_intact() {
        let script = consent_script();
        assert!(script.contains(r#"document.querySelector('[role="dialog"]')"#));
        assert!(script.contains("return 'dialog';"));
        assert!(script.contains("return '';\n})("));
    }

    #[test]
    fn script_embeds_selectors_and_patterns() {
        let script = consent_script();
        assert!(script.contains("[data-testid*=\\\"consent\\\" i] button"));
        assert!(script.contains("toestaan"));
        assert!(script.ends_with(", 8)"));
    }

    #[tokio::test(start_paused = true)]
    async fn cached_host_short_circuits() {
        let session = ScriptedSession::new(1, |_, _, _| Ok(Value::String(String::new())))
            .at("https://www.facebook.com/x");
        let cache = ConsentCache::new();
        cache.insert("facebook.com");

        assert!(ensure_consent(&session, &cache, Duration::from_secs(2)).await);
        assert_eq!(session.evaluations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn click_in_main_frame_caches_host() {
        let session = ScriptedSession::new(1, |_, _, _| Ok(Value::String("matched".into())))
            .at("https://www.facebook.com/x");
        let cache = ConsentCache::new();

        assert!(ensure_consent(&session, &cache, Duration::from_secs(2)).await);
        assert!(cache.contains("facebook.com"));
        assert_eq!(session.evaluations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn click_in_embedded_frame_is_found() {
        let session = ScriptedSession::new(3, |_, frame, _| {
            let outcome = if frame.as_str() == "frame-2" { "dialog" } else { "" };
            Ok(Value::String(outcome.into()))
        })
        .at("https://consent.example.com/");
        let cache = ConsentCache::new();

        assert!(ensure_consent(&session, &cache, Duration::from_secs(2)).await);
        assert_eq!(session.evaluations.load(Ordering::SeqCst), 3);
        assert!(cache.contains("consent.example.com"));
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_deadline() {
        let session = ScriptedSession::new(2, |_, _, _| {
            Err(BrowserError::Script("detached".to_owned()))
        })
        .at("https://www.facebook.com/x");
        let cache = ConsentCache::new();
        let started = Instant::now();

        assert!(!ensure_consent(&session, &cache, Duration::from_millis(400)).await);
        assert!(started.elapsed() >= Duration::from_millis(400));
        assert!(session.evaluations.load(Ordering::SeqCst) >= 2);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_frames_count_as_misses() {
        let mut session = ScriptedSession::new(1, |_, _, _| Ok(Value::String("matched".into())))
            .at("https://www.facebook.com/x");
        session.eval_delay = Some(Duration::from_secs(1));
        let cache = ConsentCache::new();

        assert!(!ensure_consent(&session, &cache, Duration::from_millis(500)).await);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_scan_that_clicks_still_counts() {
        let mut session = ScriptedSession::new(1, |_, _, _| Ok(Value::String("matched".into())))
            .at("https://www.facebook.com/x");
        session.eval_delay = Some(Duration::from_millis(300));
        let cache = ConsentCache::new();

        assert!(ensure_consent(&session, &cache, Duration::from_secs(2)).await);
        assert!(cache.contains("facebook.com"));
        assert_eq!(session.evaluations.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_on_a_later_pass() {
        let calls = std::sync::atomic::AtomicUsize::new(0);
        let session = ScriptedSession::new(1, move |_, _, _| {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            let outcome = if n >= 3 { "matched" } else { "" };
            Ok(Value::String(outcome.into()))
        })
        .at("https://www.facebook.com/x");
        let cache = ConsentCache::new();

        assert!(ensure_consent(&session, &cache, Duration::from_secs(2)).await);
        assert_eq!(session.evaluations.load(Ordering::SeqCst), 4);
    }
}
