//! Records shared between the extraction layer and the pipeline output.

use serde::{Deserialize, Serialize};

/// What a publisher's profile page revealed.
///
/// Every signal is optional: profile pages are gated, localized and change
/// layout often, so an empty profile is a normal outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublisherProfile {
    pub publisher_id: String,
    /// First part of the parsed category text.
    pub category: Option<String>,
    /// Every part of the parsed category text, in page order.
    pub categories: Vec<String>,
    pub raw_category_text: Option<String>,
    pub likes_text: Option<String>,
    pub followers_text: Option<String>,
    pub profile_url: String,
}

impl PublisherProfile {
    /// A profile with no signals, used when lookup fails or finds nothing.
    #[must_use]
    pub fn empty(publisher_id: &str, profile_url: String) -> Self {
        Self {
            publisher_id: publisher_id.to_string(),
            category: None,
            categories: Vec::new(),
            raw_category_text: None,
            likes_text: None,
            followers_text: None,
            profile_url,
        }
    }

    /// `true` if any of likes, followers or category was found.
    #[must_use]
    pub fn has_signal(&self) -> bool {
        self.likes_text.is_some() || self.followers_text.is_some() || self.category.is_some()
    }

    /// Category as written to output: all parts joined with ` · `.
    #[must_use]
    pub fn display_category(&self) -> Option<String> {
        if self.categories.is_empty() {
            self.category.clone()
        } else {
            Some(self.categories.join(" \u{00B7} "))
        }
    }
}

/// One accepted ad, the pipeline's unit of output.
///
/// Serialized field names follow the column names downstream sinks expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    #[serde(rename = "ad_snapshot_url")]
    pub snapshot_url: String,
    #[serde(rename = "page_name")]
    pub publisher_name: String,
    pub country: String,
    pub reach: Option<u64>,
    pub product_url: Option<String>,
    pub start_date: Option<String>,
    pub media_type: String,
    pub platforms: String,
    pub keyword: String,
    pub ad_id: String,
    pub cta_text: String,
    #[serde(rename = "ad_active_status")]
    pub active_status: String,
    #[serde(rename = "page_likes")]
    pub likes: Option<String>,
    #[serde(rename = "page_followers")]
    pub followers: Option<String>,
    #[serde(rename = "page_category")]
    pub category: Option<String>,
    #[serde(rename = "page_url")]
    pub profile_url: String,
}

/// Collapses runs of whitespace (including NBSP) into single spaces.
#[must_use]
pub fn collapse_whitespace(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}
