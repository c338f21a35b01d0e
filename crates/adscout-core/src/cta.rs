//! Call-to-action label classification and the accepted-CTA policy.
//!
//! Snapshot pages render the CTA in whatever locale the session forced, with
//! arbitrary casing and spacing ("SHOP NOW", "shop   now", "Shop Nu"). Texts
//! are folded onto a small vocabulary of canonical labels. The three shopping
//! labels are the ones the pipeline exists to find; the secondary labels are
//! recognised so that policy rejections can be tallied by name instead of
//! disappearing into the "no CTA" bucket.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Shopping labels, matched first and in this order.
static PRIMARY_CTAS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"shop\s*now").expect("valid regex"), "Shop Now"),
        (Regex::new(r"shop\s*nu").expect("valid regex"), "Shop Nu"),
        (Regex::new(r"shoppen").expect("valid regex"), "Shoppen"),
    ]
});

static SECONDARY_CTAS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    vec![
        (Regex::new(r"learn\s*more").expect("valid regex"), "Learn More"),
        (Regex::new(r"meer\s*info").expect("valid regex"), "Meer info"),
        (Regex::new(r"sign\s*up").expect("valid regex"), "Sign Up"),
        (Regex::new(r"book\s*now").expect("valid regex"), "Book Now"),
        (Regex::new(r"order\s*now").expect("valid regex"), "Order Now"),
        (Regex::new(r"bestel\s*nu").expect("valid regex"), "Bestel nu"),
        (Regex::new(r"get\s*offer").expect("valid regex"), "Get Offer"),
        (Regex::new(r"contact\s*us").expect("valid regex"), "Contact Us"),
        (Regex::new(r"send\s*message").expect("valid regex"), "Send Message"),
        (Regex::new(r"apply\s*now").expect("valid regex"), "Apply Now"),
        (Regex::new(r"subscribe").expect("valid regex"), "Subscribe"),
        (Regex::new(r"download").expect("valid regex"), "Download"),
    ]
});

/// Longest text considered a CTA candidate. Longer texts are body copy.
pub const MAX_CTA_TEXT_LEN: usize = 20;

/// Folds `text` onto a canonical CTA label, or `None` if it names no known CTA.
///
/// Matching is case-insensitive and tolerant of any whitespace between words.
#[must_use]
pub fn classify_cta(text: &str) -> Option<&'static str> {
    let clean = text.trim().to_lowercase();
    if clean.is_empty() {
        return None;
    }
    PRIMARY_CTAS
        .iter()
        .chain(SECONDARY_CTAS.iter())
        .find(|(re, _)| re.is_match(&clean))
        .map(|(_, label)| *label)
}

/// Picks the CTA from a page's candidate texts.
///
/// Candidates longer than [`MAX_CTA_TEXT_LEN`] are ignored. Shopping labels
/// win over secondary labels regardless of position; within a tier the first
/// candidate in document order wins.
#[must_use]
pub fn pick_cta<S: AsRef<str>>(candidates: &[S]) -> Option<&'static str> {
    let short: Vec<String> = candidates
        .iter()
        .map(|c| c.as_ref().trim().to_lowercase())
        .filter(|c| !c.is_empty() && c.chars().count() <= MAX_CTA_TEXT_LEN)
        .collect();

    let first_in = |table: &[(Regex, &'static str)]| {
        short.iter().find_map(|text| {
            table
                .iter()
                .find(|(re, _)| re.is_match(text))
                .map(|(_, label)| *label)
        })
    };

    first_in(PRIMARY_CTAS.as_slice()).or_else(|| first_in(SECONDARY_CTAS.as_slice()))
}

/// The set of CTA labels a run keeps. Comparison is case-insensitive.
#[derive(Debug, Clone)]
pub struct AcceptedCtas {
    labels: HashSet<String>,
}

impl AcceptedCtas {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            labels: labels
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    #[must_use]
    pub fn accepts(&self, label: &str) -> bool {
        self.labels.contains(&label.trim().to_lowercase())
    }
}

impl Default for AcceptedCtas {
    fn default() -> Self {
        Self::new(["Shop Now", "Shop Nu", "Shoppen"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shop_now_variants_share_one_label() {
        assert_eq!(classify_cta("SHOP NOW"), Some("Shop Now"));
        assert_eq!(classify_cta("shop   now"), Some("Shop Now"));
        assert_eq!(classify_cta("Shop Now"), Some("Shop Now"));
        assert_eq!(classify_cta("shopnow"), Some("Shop Now"));
    }

    #[test]
    fn dutch_labels_are_recognised() {
        assert_eq!(classify_cta("Shop nu"), Some("Shop Nu"));
        assert_eq!(classify_cta("  SHOPPEN "), Some("Shoppen"));
    }

    #[test]
    fn secondary_labels_are_recognised() {
        assert_eq!(classify_cta("Learn more"), Some("Learn More"));
        assert_eq!(classify_cta("SIGN UP"), Some("Sign Up"));
    }

    #[test]
    fn unknown_or_empty_text_has_no_label() {
        assert_eq!(classify_cta(""), None);
        assert_eq!(classify_cta("   "), None);
        assert_eq!(classify_cta("Sponsored"), None);
    }

    #[test]
    fn pick_cta_prefers_shopping_labels() {
        let texts = ["Learn More", "Sponsored", "Shop Nu"];
        assert_eq!(pick_cta(&texts), Some("Shop Nu"));
    }

    #[test]
    fn pick_cta_falls_back_to_secondary_label() {
        let texts = ["Sponsored", "Learn More"];
        assert_eq!(pick_cta(&texts), Some("Learn More"));
    }

    #[test]
    fn pick_cta_ignores_long_texts() {
        let texts = ["Visit our shop now for summer deals on everything"];
        assert_eq!(pick_cta(&texts), None);
    }

    #[test]
    fn accepted_ctas_compare_case_insensitively() {
        let accepted = AcceptedCtas::default();
        assert!(accepted.accepts("Shop Now"));
        assert!(accepted.accepts("shop nu"));
        assert!(accepted.accepts("SHOPPEN"));
        assert!(!accepted.accepts("Learn More"));
    }

    #[test]
    fn custom_accepted_set() {
        let accepted = AcceptedCtas::new(["Learn More"]);
        assert!(accepted.accepts("Learn More"));
        assert!(!accepted.accepts("Shop Now"));
    }
}
