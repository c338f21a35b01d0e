//! Graph API `ads_archive` response types.
//!
//! ## Observed shape
//!
//! ```json
//! {
//!   "data": [{ "id": "123", "ad_snapshot_url": "...", "page_id": "456", ... }],
//!   "paging": { "cursors": { "before": "...", "after": "..." }, "next": "..." }
//! }
//! ```
//!
//! `paging` is absent on the last page. `eu_total_reach` is only present
//! for ads delivered in the EU and is occasionally a string; anything that is
//! not a non-negative integer is treated as absent.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// Top-level response from `GET /{version}/ads_archive`.
#[derive(Debug, Deserialize)]
pub struct AdsArchiveResponse {
    #[serde(default)]
    pub data: Vec<CandidateAd>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub cursors: Option<Cursors>,
}

#[derive(Debug, Deserialize)]
pub struct Cursors {
    #[serde(default)]
    pub after: Option<String>,
}

/// One ad from a catalog page. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CandidateAd {
    /// Empty when the archive omits it.
    #[serde(default)]
    pub id: String,

    #[serde(rename = "ad_snapshot_url", default)]
    pub snapshot_url: String,

    #[serde(rename = "page_id", default)]
    pub publisher_id: String,

    #[serde(rename = "page_name", default)]
    pub publisher_name: String,

    /// ISO-8601 timestamp, e.g. `"2025-03-01T08:00:00+0000"`.
    #[serde(rename = "ad_delivery_start_time", default)]
    pub delivery_start_time: Option<String>,

    #[serde(rename = "ad_active_status", default)]
    pub active_status: Option<String>,

    #[serde(default)]
    pub media_type: Option<String>,

    #[serde(rename = "publisher_platforms", default)]
    pub platforms: Vec<String>,

    #[serde(
        rename = "eu_total_reach",
        default,
        deserialize_with = "lenient_u64"
    )]
    pub reach_metric: Option<u64>,
}

impl CandidateAd {
    /// Delivery start as `YYYY-MM-DD`, or `None` if the timestamp is missing.
    #[must_use]
    pub fn start_date(&self) -> Option<String> {
        self.delivery_start_time
            .as_deref()
            .and_then(|ts| ts.get(..10))
            .map(str::to_string)
    }
}

/// One page of catalog results plus the cursor for the next page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogPage {
    pub ads: Vec<CandidateAd>,
    pub next_cursor: Option<String>,
}

impl From<AdsArchiveResponse> for CatalogPage {
    fn from(response: AdsArchiveResponse) -> Self {
        let next_cursor = response
            .paging
            .and_then(|p| p.cursors)
            .and_then(|c| c.after)
            .filter(|c| !c.is_empty());
        Self {
            ads: response.data,
            next_cursor,
        }
    }
}

/// Search parameters for one catalog query. The cursor is passed separately
/// because it changes on every page while the query does not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    /// Upper-case ISO country code.
    pub country: String,
    pub search_terms: String,
    pub active_only: bool,
    /// Requested page size; clamped to the API's accepted range on send.
    pub page_size: u32,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_u64()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_page_with_cursor() {
        let body = serde_json::json!({
            "data": [{
                "id": "1",
                "ad_snapshot_url": "https://www.facebook.com/ads/archive/render_ad/?id=1",
                "page_id": "77",
                "page_name": "Sneaker Shop",
                "ad_delivery_start_time": "2025-03-01T08:00:00+0000",
                "ad_active_status": "ACTIVE",
                "media_type": "VIDEO",
                "publisher_platforms": ["facebook", "instagram"],
                "eu_total_reach": 1234
            }],
            "paging": { "cursors": { "before": "B", "after": "A1" } }
        });
        let response: AdsArchiveResponse = serde_json::from_value(body).unwrap();
        let page = CatalogPage::from(response);
        assert_eq!(page.next_cursor.as_deref(), Some("A1"));
        assert_eq!(page.ads.len(), 1);
        let ad = &page.ads[0];
        assert_eq!(ad.publisher_id, "77");
        assert_eq!(ad.platforms, vec!["facebook", "instagram"]);
        assert_eq!(ad.reach_metric, Some(1234));
        assert_eq!(ad.start_date().as_deref(), Some("2025-03-01"));
    }

    #[test]
    fn missing_paging_means_no_cursor() {
        let response: AdsArchiveResponse =
            serde_json::from_value(serde_json::json!({ "data": [] })).unwrap();
        let page = CatalogPage::from(response);
        assert!(page.ads.is_empty());
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn missing_id_defaults_to_empty() {
        let ad: CandidateAd = serde_json::from_value(serde_json::json!({
            "page_id": "5",
            "ad_snapshot_url": "https://www.facebook.com/ads/archive/render_ad/?id=9"
        }))
        .unwrap();
        assert_eq!(ad.id, "");
        assert_eq!(ad.publisher_id, "5");
    }

    #[test]
    fn non_numeric_reach_is_absent() {
        let ad: CandidateAd = serde_json::from_value(serde_json::json!({
            "id": "2",
            "eu_total_reach": "n/a"
        }))
        .unwrap();
        assert!(ad.reach_metric.is_none());
        assert!(ad.start_date().is_none());
        assert!(ad.platforms.is_empty());
    }
}
