//! HTTP client for the Graph API `ads_archive` endpoint.
//!
//! Wraps `reqwest` with catalog-specific error handling, access token
//! management and typed response deserialization. Transient transport
//! failures are retried inside [`CatalogClient::request_json`]; the page-level
//! API ([`CatalogClient::fetch_page`]) propagates whatever the transport
//! finally returns.

use std::time::Duration;

use adscout_core::{AppConfig, ConfigError};
use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::CatalogError;
use crate::retry::RetryPolicy;
use crate::types::{AdsArchiveResponse, CatalogPage, PageQuery};

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com";
const DEFAULT_GRAPH_VERSION: &str = "v23.0";

/// Page sizes the ads archive accepts.
pub const MIN_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 200;

/// Longest slice of an error body kept on [`CatalogError::Api`].
const ERROR_BODY_LIMIT: usize = 800;

/// Fields requested for every ad.
const AD_FIELDS: &[&str] = &[
    "id",
    "ad_snapshot_url",
    "page_id",
    "page_name",
    "publisher_platforms",
    "ad_delivery_start_time",
    "ad_delivery_stop_time",
    "ad_active_status",
    "media_type",
    "eu_total_reach",
];

/// Client for the Graph API ads archive.
///
/// Use [`CatalogClient::new`] for production or
/// [`CatalogClient::with_base_url`] to point at a mock server in tests.
pub struct CatalogClient {
    client: Client,
    access_token: Option<String>,
    base_url: Url,
    graph_version: String,
    retry: RetryPolicy,
}

impl CatalogClient {
    /// Creates a client pointed at the production Graph API, with retries
    /// disabled.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(access_token: Option<&str>, timeout_secs: u64) -> Result<Self, CatalogError> {
        Self::with_base_url(access_token, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`CatalogError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        access_token: Option<&str>,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("adscout/0.1 (ad-research)")
            .build()?;

        // Ensure exactly one trailing slash so that `join` appends the
        // version segment instead of replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let parsed = Url::parse(&normalised).map_err(|e| CatalogError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            access_token: access_token
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_owned),
            base_url: parsed,
            graph_version: DEFAULT_GRAPH_VERSION.to_owned(),
            retry: RetryPolicy::default(),
        })
    }

    /// Builds a client from the loaded application config.
    ///
    /// # Errors
    ///
    /// See [`CatalogClient::with_base_url`].
    pub fn from_config(config: &AppConfig) -> Result<Self, CatalogError> {
        Ok(Self::with_base_url(
            config.meta_ads_token.as_deref(),
            config.request_timeout_secs,
            &config.graph_base_url,
        )?
        .with_graph_version(&config.graph_version)
        .with_retry(config.max_retries, config.retry_backoff_ms))
    }

    /// Sets the Graph API version path segment, e.g. `"v23.0"`.
    #[must_use]
    pub fn with_graph_version(mut self, version: &str) -> Self {
        self.graph_version = version.trim_matches('/').to_owned();
        self
    }

    /// Enables transport retries: up to `max_retries` extra attempts with a
    /// linear back-off of `backoff_base_ms × attempt`.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.retry = RetryPolicy::new(max_retries, backoff_base_ms);
        self
    }

    /// Fetches one page of ads, starting after `after` when given.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Config`] if no access token is configured; no
    ///   request is made in that case.
    /// - [`CatalogError::Api`] on a non-success status (after retries for 5xx).
    /// - [`CatalogError::Http`] on network failure after retries.
    /// - [`CatalogError::Deserialize`] if the payload does not match the
    ///   expected shape.
    pub async fn fetch_page(
        &self,
        query: &PageQuery,
        after: Option<&str>,
    ) -> Result<CatalogPage, CatalogError> {
        let token = self
            .access_token
            .as_deref()
            .ok_or(ConfigError::MissingCredential)?;

        let url = self.build_url(token, query, after)?;
        let body = self.request_json(&url).await?;

        let response: AdsArchiveResponse =
            serde_json::from_value(body).map_err(|e| CatalogError::Deserialize {
                context: format!(
                    "ads_archive(country={}, after={})",
                    query.country,
                    after.unwrap_or("-")
                ),
                source: e,
            })?;

        Ok(CatalogPage::from(response))
    }

    /// Builds the `ads_archive` URL with percent-encoded query parameters.
    fn build_url(
        &self,
        token: &str,
        query: &PageQuery,
        after: Option<&str>,
    ) -> Result<Url, CatalogError> {
        let mut url = self
            .base_url
            .join(&format!("{}/ads_archive", self.graph_version))
            .map_err(|e| CatalogError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        let page_size = clamp_page_size(query.page_size);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("access_token", token);
            pairs.append_pair("ad_type", "ALL");
            pairs.append_pair("ad_reached_countries", &query.country);
            pairs.append_pair(
                "ad_active_status",
                if query.active_only { "ACTIVE" } else { "ALL" },
            );
            pairs.append_pair("search_terms", &query.search_terms);
            pairs.append_pair("limit", &page_size.to_string());
            pairs.append_pair("fields", &AD_FIELDS.join(","));
            if let Some(cursor) = after {
                pairs.append_pair("after", cursor);
            }
            if let Some(min) = query.date_min {
                pairs.append_pair("ad_delivery_date_min", &min.format("%Y-%m-%d").to_string());
            }
            if let Some(max) = query.date_max {
                pairs.append_pair("ad_delivery_date_max", &max.format("%Y-%m-%d").to_string());
            }
        }
        Ok(url)
    }

    /// Sends a GET request with retry on transient failures and parses the
    /// response body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Api`] for a non-2xx status,
    /// [`CatalogError::Http`] on network failure and
    /// [`CatalogError::Deserialize`] if the body is not valid JSON.
    async fn request_json(&self, url: &Url) -> Result<serde_json::Value, CatalogError> {
        self.retry.run(|| {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .get(url)
                    .header(reqwest::header::ACCEPT, "application/json")
                    .send()
                    .await
                    .map_err(transport_error)?;
                let status = response.status();
                let body = response.text().await.map_err(transport_error)?;

                if !status.is_success() {
                    return Err(CatalogError::Api {
                        status: status.as_u16(),
                        body: truncate(&body, ERROR_BODY_LIMIT),
                    });
                }

                serde_json::from_str(&body).map_err(|e| CatalogError::Deserialize {
                    context: format!("ads_archive body: {}", truncate(&body, 120)),
                    source: e,
                })
            }
        })
        .await
    }
}

/// Wraps a transport failure without its request URL, which carries the
/// access token as a query parameter.
fn transport_error(err: reqwest::Error) -> CatalogError {
    CatalogError::Http(err.without_url())
}

/// Source of catalog pages. The pipeline depends on this seam so runs can be
/// scripted in tests without a network.
#[async_trait]
pub trait AdCatalog: Send + Sync {
    /// Fetches one page of ads for `query`, continuing after `after`.
    async fn fetch_page(
        &self,
        query: &PageQuery,
        after: Option<&str>,
    ) -> Result<CatalogPage, CatalogError>;
}

#[async_trait]
impl AdCatalog for CatalogClient {
    async fn fetch_page(
        &self,
        query: &PageQuery,
        after: Option<&str>,
    ) -> Result<CatalogPage, CatalogError> {
        CatalogClient::fetch_page(self, query, after).await
    }
}

/// Clamps a requested page size to [`MIN_PAGE_SIZE`, `MAX_PAGE_SIZE`].
#[must_use]
pub fn clamp_page_size(requested: u32) -> u32 {
    requested.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
