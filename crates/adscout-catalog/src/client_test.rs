use chrono::NaiveDate;

use super::*;

fn test_client(base_url: &str) -> CatalogClient {
    CatalogClient::with_base_url(Some("test-token"), 30, base_url)
        .expect("client construction should not fail")
}

fn query() -> PageQuery {
    PageQuery {
        country: "NL".to_owned(),
        search_terms: "sneakers".to_owned(),
        active_only: true,
        page_size: 50,
        date_min: None,
        date_max: None,
    }
}

fn param<'a>(url: &'a Url, key: &str) -> Option<std::borrow::Cow<'a, str>> {
    url.query_pairs().find(|(k, _)| k == key).map(|(_, v)| v)
}

#[test]
fn build_url_targets_versioned_ads_archive() {
    let client = test_client("https://graph.example.com/");
    let url = client.build_url("test-token", &query(), None).unwrap();
    assert_eq!(url.path(), "/v23.0/ads_archive");
    assert_eq!(param(&url, "access_token").as_deref(), Some("test-token"));
    assert_eq!(param(&url, "ad_reached_countries").as_deref(), Some("NL"));
    assert_eq!(param(&url, "ad_active_status").as_deref(), Some("ACTIVE"));
    assert_eq!(param(&url, "search_terms").as_deref(), Some("sneakers"));
    assert_eq!(param(&url, "limit").as_deref(), Some("50"));
    assert!(param(&url, "after").is_none());
    assert!(param(&url, "fields").unwrap().contains("eu_total_reach"));
}

#[test]
fn build_url_includes_cursor_and_dates() {
    let client = test_client("https://graph.example.com");
    let mut q = query();
    q.active_only = false;
    q.date_min = NaiveDate::from_ymd_opt(2025, 1, 1);
    q.date_max = NaiveDate::from_ymd_opt(2025, 2, 28);
    let url = client.build_url("t", &q, Some("CURSOR==")).unwrap();
    assert_eq!(param(&url, "after").as_deref(), Some("CURSOR=="));
    assert_eq!(param(&url, "ad_active_status").as_deref(), Some("ALL"));
    assert_eq!(param(&url, "ad_delivery_date_min").as_deref(), Some("2025-01-01"));
    assert_eq!(param(&url, "ad_delivery_date_max").as_deref(), Some("2025-02-28"));
}

#[test]
fn build_url_respects_graph_version() {
    let client = test_client("https://graph.example.com").with_graph_version("/v21.0/");
    let url = client.build_url("t", &query(), None).unwrap();
    assert_eq!(url.path(), "/v21.0/ads_archive");
}

#[test]
fn page_size_is_clamped() {
    assert_eq!(clamp_page_size(1), 10);
    assert_eq!(clamp_page_size(25), 25);
    assert_eq!(clamp_page_size(5_000), 200);
}

#[test]
fn blank_token_counts_as_missing() {
    let client = CatalogClient::with_base_url(Some("  "), 30, "https://graph.example.com")
        .expect("client construction should not fail");
    assert!(client.access_token.is_none());
}

#[test]
fn invalid_base_url_is_rejected() {
    let result = CatalogClient::with_base_url(Some("t"), 30, "not a url");
    assert!(matches!(result, Err(CatalogError::InvalidBaseUrl { .. })));
}

#[test]
fn truncate_counts_chars() {
    assert_eq!(truncate("héllo", 2), "hé");
}
