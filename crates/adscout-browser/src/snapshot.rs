//! Snapshot page extraction: call-to-action label and outbound product link.

use std::time::Duration;

use adscout_core::pick_cta;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use url::Url;

use crate::consent::{ensure_consent, ConsentCache};
use crate::links::pick_product_url;
use crate::session::PageSession;

pub const SNAPSHOT_NAV_TIMEOUT: Duration = Duration::from_secs(15);
pub const SNAPSHOT_CONSENT_BUDGET: Duration = Duration::from_secs(2);
pub const INTERACTIVE_WAIT: Duration = Duration::from_millis(600);
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(8);
const SELECTOR_POLL: Duration = Duration::from_millis(100);

/// Elements whose visible text or aria-label may carry the CTA.
pub const INTERACTIVE_SELECTOR: &str =
    r#"a[role="link"],button,div[role="button"],a[aria-label]"#;

const SCAN_SCRIPT: &str = r#"(() => {
  const hrefs = Array.from(document.querySelectorAll('a[href^="http"]'))
    .map((a) => a.getAttribute('href'))
    .filter(Boolean);
  const texts = Array.from(document.querySelectorAll('a[role="link"],button,div[role="button"],a[aria-label]'))
    .map((n) => (n.innerText || n.getAttribute('aria-label') || '').trim())
    .filter(Boolean);
  return { hrefs, texts };
})()"#;

/// What one snapshot visit yields. Both fields are `None` when the page could
/// not be loaded or did not show them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SnapshotBits {
    pub product_url: Option<String>,
    /// Normalized CTA label, e.g. `"Shop Now"`.
    pub cta_text: Option<String>,
}

/// Raw link and label candidates collected in the page.
#[derive(Debug, Default, Deserialize)]
struct SnapshotScan {
    #[serde(default)]
    hrefs: Vec<String>,
    #[serde(default)]
    texts: Vec<String>,
}

/// Adds `locale=<cookie_locale>` to `raw` unless a `locale` parameter is
/// already present. Unparseable URLs are returned as-is.
#[must_use]
pub fn with_locale(raw: &str, cookie_locale: &str) -> String {
    let Ok(mut url) = Url::parse(raw) else {
        return raw.to_owned();
    };
    if url.query_pairs().any(|(k, v)| k == "locale" && !v.is_empty()) {
        return url.into();
    }
    url.query_pairs_mut().append_pair("locale", cookie_locale);
    url.into()
}

/// Polls until `selector` matches in the main frame or `budget` elapses.
pub(crate) async fn wait_for_selector<S>(session: &S, selector: &str, budget: Duration) -> bool
where
    S: PageSession + ?Sized,
{
    let selector_json = serde_json::to_string(selector).unwrap_or_else(|_| "\"body\"".into());
    let script = format!("document.querySelector({selector_json}) !== null");
    let deadline = Instant::now() + budget;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return false;
        }
        if let Ok(Ok(serde_json::Value::Bool(true))) =
            tokio::time::timeout(remaining, session.evaluate(&script)).await
        {
            return true;
        }
        tokio::time::sleep(SELECTOR_POLL.min(remaining)).await;
    }
}

/// Visits a snapshot page and extracts its CTA label and product link.
///
/// Navigation failures, timeouts and script errors degrade to empty fields.
pub async fn extract_snapshot<S>(
    session: &S,
    consent: &ConsentCache,
    snapshot_url: &str,
    cookie_locale: &str,
) -> SnapshotBits
where
    S: PageSession + ?Sized,
{
    let target = with_locale(snapshot_url, cookie_locale);
    if let Err(err) = session.goto(&target, SNAPSHOT_NAV_TIMEOUT).await {
        tracing::debug!(url = %target, error = %err, "snapshot navigation failed");
        return SnapshotBits::default();
    }

    ensure_consent(session, consent, SNAPSHOT_CONSENT_BUDGET).await;
    wait_for_selector(session, INTERACTIVE_SELECTOR, INTERACTIVE_WAIT).await;

    let scan = match tokio::time::timeout(SCRIPT_TIMEOUT, session.evaluate(SCAN_SCRIPT)).await {
        Ok(Ok(value)) => serde_json::from_value::<SnapshotScan>(value).unwrap_or_default(),
        Ok(Err(err)) => {
            tracing::debug!(url = %target, error = %err, "snapshot scan failed");
            SnapshotScan::default()
        }
        Err(_) => {
            tracing::debug!(url = %target, "snapshot scan timed out");
            SnapshotScan::default()
        }
    };

    SnapshotBits {
        product_url: pick_product_url(&scan.hrefs),
        cta_text: pick_cta(&scan.texts).map(str::to_owned),
    }
}
