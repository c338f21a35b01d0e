//! Outbound product-link selection from the hrefs found on a snapshot page.

use url::Url;

/// Hosts whose links point back into the ad platform itself.
const PLATFORM_HOST_SUFFIXES: &[&str] = &["facebook.com", "fb.com", "meta.com"];

/// Unwraps `https://l.facebook.com/l.php?u=<target>` redirect links.
/// Anything else is returned unchanged.
#[must_use]
pub fn unwrap_redirect(href: &str) -> String {
    let Ok(parsed) = Url::parse(href) else {
        return href.to_owned();
    };
    if parsed.host_str() == Some("l.facebook.com") && parsed.path() == "/l.php" {
        if let Some((_, target)) = parsed.query_pairs().find(|(k, _)| k == "u") {
            if !target.is_empty() {
                return target.into_owned();
            }
        }
    }
    href.to_owned()
}

/// Returns `true` if `href` points outside the ad platform.
fn is_outbound(href: &str) -> bool {
    let Ok(parsed) = Url::parse(href) else {
        return false;
    };
    let Some(host) = parsed.host_str() else {
        return false;
    };
    let host = host.to_lowercase();
    !PLATFORM_HOST_SUFFIXES
        .iter()
        .any(|suffix| host.ends_with(suffix))
}

/// Picks the first outbound link from `hrefs` (document order), after
/// unwrapping redirect links, with the fragment stripped.
#[must_use]
pub fn pick_product_url<S: AsRef<str>>(hrefs: &[S]) -> Option<String> {
    hrefs
        .iter()
        .map(|h| h.as_ref().trim())
        .filter(|h| h.starts_with("http"))
        .map(unwrap_redirect)
        .find(|h| is_outbound(h))
        .map(|h| match h.split_once('#') {
            Some((before, _)) => before.to_owned(),
            None => h,
        })
}
