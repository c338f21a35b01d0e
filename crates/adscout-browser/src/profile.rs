//! Publisher profile lookup: category, likes and followers scraped from the
//! publisher's public profile page.

use std::sync::LazyLock;
use std::time::Duration;

use adscout_core::{split_category, PublisherProfile};
use regex::Regex;

use crate::consent::{ensure_consent, ConsentCache};
use crate::error::BrowserError;
use crate::session::PageSession;
use crate::snapshot::wait_for_selector;

const PROFILE_NAV_TIMEOUT: Duration = Duration::from_secs(15);
const PROFILE_CONSENT_BUDGET: Duration = Duration::from_secs(2);
const BODY_WAIT: Duration = Duration::from_millis(1500);
const OVERLAY_CLOSE_TIMEOUT: Duration = Duration::from_millis(500);
const SCRIPT_TIMEOUT: Duration = Duration::from_secs(8);

const CLOSE_OVERLAY_SCRIPT: &str = r#"(() => {
  const btn = document.querySelector('[aria-label="Sluiten"], [aria-label="Close"]');
  if (btn) { btn.click(); return true; }
  return false;
})()"#;

const BODY_TEXT_SCRIPT: &str = "(document.body && document.body.innerText) || ''";

static LIKES_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([\d.,\s]+(?:[KMB]|d\.)?)\s*(?:likes|vind-ik-leuks|mentions j.?aime|me gusta|curtidas|mi piace|Gefällt\s*mir)",
    )
    .expect("valid regex")
});

static FOLLOWERS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)([\d.,\s]+(?:[KMB]|d\.)?)\s*(?:followers|volgers|abonnés|seguidores|abonnenten|seguaci)",
    )
    .expect("valid regex")
});

/// Localized "Page · <category>" headers, tried in order.
static CATEGORY_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    ["Pagina", "Page", "Página", "Seite"]
        .iter()
        .map(|word| {
            Regex::new(&format!(r"(?i){word}\s*·\s*([^\n•|]{{2,60}})")).expect("valid regex")
        })
        .collect()
});

/// Desktop profile URL; also the URL reported when lookups fail.
#[must_use]
pub fn profile_url(publisher_id: &str, cookie_locale: &str) -> String {
    format!("https://www.facebook.com/profile.php?id={publisher_id}&locale={cookie_locale}")
}

/// Lightweight profile URL used when the desktop page reveals nothing.
#[must_use]
pub fn fallback_profile_url(publisher_id: &str, cookie_locale: &str) -> String {
    format!(
        "https://mbasic.facebook.com/profile.php?id={publisher_id}&refid=17&locale={cookie_locale}"
    )
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// Parses the visible text of a profile page.
#[must_use]
pub fn parse_profile_text(publisher_id: &str, text: &str, page_url: &str) -> PublisherProfile {
    let raw_category = CATEGORY_RES
        .iter()
        .find_map(|re| first_capture(re, text));
    let categories = raw_category
        .as_deref()
        .map(split_category)
        .unwrap_or_default();
    let category = categories.first().cloned().or_else(|| raw_category.clone());

    PublisherProfile {
        publisher_id: publisher_id.to_owned(),
        category,
        categories,
        raw_category_text: raw_category,
        likes_text: first_capture(&LIKES_RE, text),
        followers_text: first_capture(&FOLLOWERS_RE, text),
        profile_url: page_url.to_owned(),
    }
}

async fn read_body_text<S>(session: &S) -> String
where
    S: PageSession + ?Sized,
{
    match tokio::time::timeout(SCRIPT_TIMEOUT, session.evaluate(BODY_TEXT_SCRIPT)).await {
        Ok(Ok(serde_json::Value::String(text))) => text,
        _ => String::new(),
    }
}

/// Scrapes a publisher profile, falling back to the lightweight page when the
/// desktop page yields no likes, followers or category.
///
/// # Errors
///
/// Returns [`BrowserError`] if either navigation fails. Callers degrade that
/// to an empty profile.
pub async fn scrape_profile<S>(
    session: &S,
    consent: &ConsentCache,
    publisher_id: &str,
    cookie_locale: &str,
) -> Result<PublisherProfile, BrowserError>
where
    S: PageSession + ?Sized,
{
    let primary = profile_url(publisher_id, cookie_locale);
    session.goto(&primary, PROFILE_NAV_TIMEOUT).await?;
    ensure_consent(session, consent, PROFILE_CONSENT_BUDGET).await;
    wait_for_selector(session, "body", BODY_WAIT).await;
    let _ = tokio::time::timeout(OVERLAY_CLOSE_TIMEOUT, session.evaluate(CLOSE_OVERLAY_SCRIPT)).await;
    if let Err(err) = session.press_escape().await {
        tracing::debug!(publisher_id, error = %err, "escape key press failed");
    }

    let landed = session.current_url().await.unwrap_or_else(|| primary.clone());
    let profile = parse_profile_text(publisher_id, &read_body_text(session).await, &landed);
    if profile.has_signal() {
        return Ok(profile);
    }

    let fallback = fallback_profile_url(publisher_id, cookie_locale);
    tracing::debug!(publisher_id, "desktop profile empty, trying lightweight page");
    session.goto(&fallback, PROFILE_NAV_TIMEOUT).await?;
    wait_for_selector(session, "body", BODY_WAIT).await;
    ensure_consent(session, consent, PROFILE_CONSENT_BUDGET).await;

    Ok(parse_profile_text(
        publisher_id,
        &read_body_text(session).await,
        &fallback,
    ))
}
