//! The run request accepted by the pipeline entry point, and its resolution
//! against an optional Ad Library URL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::ConfigError;

const DEFAULT_COUNTRY: &str = "NL";

/// Caller-supplied inputs for one pipeline run.
///
/// `url_or_query` may hold an Ad Library search URL, whose query string
/// supplies defaults for the other fields, or a bare search phrase.
/// Explicit fields always win over values read from the URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunRequest {
    pub url_or_query: Option<String>,
    pub country: Option<String>,
    pub keyword: Option<String>,
    pub limit: usize,
    pub active_only: Option<bool>,
    pub date_min: Option<String>,
    pub date_max: Option<String>,
    /// Overrides the configured category allow-list for this run.
    pub required_categories: Option<Vec<String>>,
    /// Overrides the configured worker count for this run.
    pub concurrency: Option<usize>,
    pub headless: bool,
}

/// A validated run request with every default applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRequest {
    /// Upper-case ISO country code.
    pub country: String,
    pub keyword: String,
    pub limit: usize,
    pub active_only: bool,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub required_categories: Option<Vec<String>>,
    pub concurrency: Option<usize>,
    pub headless: bool,
}

/// Search parameters recovered from an Ad Library URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibraryUrlParams {
    pub country: Option<String>,
    pub query: Option<String>,
    pub date_min: Option<String>,
    pub date_max: Option<String>,
    pub active_only: Option<bool>,
}

/// Reads search parameters from an Ad Library URL.
///
/// Recognises both the public web UI parameter names (`country`, `q`,
/// `start_date[min]`, `active_status`) and the Graph API names
/// (`ad_reached_countries`, `search_terms`, `ad_delivery_date_min`).
/// Returns `None` if `raw` is not an absolute URL.
#[must_use]
pub fn parse_library_url(raw: &str) -> Option<LibraryUrlParams> {
    let url = Url::parse(raw.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }

    let mut params = LibraryUrlParams::default();
    for (key, value) in url.query_pairs() {
        let value = value.trim().to_string();
        if value.is_empty() {
            continue;
        }
        match key.as_ref() {
            "country" | "ad_reached_countries" => {
                params.country.get_or_insert(value);
            }
            "q" | "search_terms" => {
                params.query.get_or_insert(value);
            }
            "ad_delivery_date_min" | "start_date[min]" => {
                params.date_min.get_or_insert(value);
            }
            "ad_delivery_date_max" | "start_date[max]" => {
                params.date_max.get_or_insert(value);
            }
            "active_status" => {
                params
                    .active_only
                    .get_or_insert(value.eq_ignore_ascii_case("active"));
            }
            _ => {}
        }
    }
    Some(params)
}

impl RunRequest {
    /// Applies URL-derived defaults and validates the request.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::MissingParameter`] if no keyword can be determined.
    /// - [`ConfigError::InvalidParameter`] if the limit is zero or a date is
    ///   not `YYYY-MM-DD`.
    pub fn resolve(&self) -> Result<ResolvedRequest, ConfigError> {
        let raw_input = self
            .url_or_query
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty());
        let (from_url, bare_query) = match raw_input {
            Some(input) => match parse_library_url(input) {
                Some(params) => (params, None),
                None => (LibraryUrlParams::default(), Some(input.to_string())),
            },
            None => (LibraryUrlParams::default(), None),
        };

        let country = non_empty(self.country.as_deref())
            .or(from_url.country)
            .unwrap_or_else(|| DEFAULT_COUNTRY.to_string())
            .to_uppercase();

        let keyword = non_empty(self.keyword.as_deref())
            .or(from_url.query)
            .or(bare_query)
            .ok_or(ConfigError::MissingParameter("keyword"))?;

        if self.limit == 0 {
            return Err(ConfigError::InvalidParameter {
                field: "limit",
                reason: "must be at least 1".to_string(),
            });
        }

        let date_min = parse_date(
            "date_min",
            non_empty(self.date_min.as_deref()).or(from_url.date_min),
        )?;
        let date_max = parse_date(
            "date_max",
            non_empty(self.date_max.as_deref()).or(from_url.date_max),
        )?;

        let required_categories = self
            .required_categories
            .as_ref()
            .map(|cats| {
                cats.iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|cats| !cats.is_empty());

        Ok(ResolvedRequest {
            country,
            keyword,
            limit: self.limit,
            active_only: self.active_only.or(from_url.active_only).unwrap_or(true),
            date_min,
            date_max,
            required_categories,
            concurrency: self.concurrency.map(|c| c.max(1)),
            headless: self.headless,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_date(field: &'static str, raw: Option<String>) -> Result<Option<NaiveDate>, ConfigError> {
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|e| ConfigError::InvalidParameter {
            field,
            reason: format!("\"{s}\": {e}"),
        })
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> RunRequest {
        RunRequest {
            limit: 25,
            headless: true,
            ..RunRequest::default()
        }
    }

    #[test]
    fn parses_web_ui_library_url() {
        let url = "https://www.facebook.com/ads/library/?active_status=active&ad_type=all\
                   &country=be&q=sneakers%20sale&start_date[min]=2025-01-01";
        let params = parse_library_url(url).expect("absolute url");
        assert_eq!(params.country.as_deref(), Some("be"));
        assert_eq!(params.query.as_deref(), Some("sneakers sale"));
        assert_eq!(params.date_min.as_deref(), Some("2025-01-01"));
        assert_eq!(params.active_only, Some(true));
    }

    #[test]
    fn parses_graph_style_names() {
        let url = "https://graph.facebook.com/v23.0/ads_archive?ad_reached_countries=DE\
                   &search_terms=schuhe&ad_delivery_date_max=2025-02-01&active_status=all";
        let params = parse_library_url(url).unwrap();
        assert_eq!(params.country.as_deref(), Some("DE"));
        assert_eq!(params.query.as_deref(), Some("schuhe"));
        assert_eq!(params.date_max.as_deref(), Some("2025-02-01"));
        assert_eq!(params.active_only, Some(false));
    }

    #[test]
    fn bare_phrase_is_not_a_url() {
        assert!(parse_library_url("running shoes").is_none());
    }

    #[test]
    fn resolve_uses_url_values_as_defaults() {
        let req = RunRequest {
            url_or_query: Some(
                "https://www.facebook.com/ads/library/?country=fr&q=robe&active_status=all".into(),
            ),
            ..request()
        };
        let resolved = req.resolve().unwrap();
        assert_eq!(resolved.country, "FR");
        assert_eq!(resolved.keyword, "robe");
        assert!(!resolved.active_only);
    }

    #[test]
    fn explicit_fields_override_url() {
        let req = RunRequest {
            url_or_query: Some("https://www.facebook.com/ads/library/?country=fr&q=robe".into()),
            country: Some("nl".into()),
            keyword: Some("jurk".into()),
            active_only: Some(true),
            ..request()
        };
        let resolved = req.resolve().unwrap();
        assert_eq!(resolved.country, "NL");
        assert_eq!(resolved.keyword, "jurk");
        assert!(resolved.active_only);
    }

    #[test]
    fn bare_query_becomes_keyword_and_country_defaults() {
        let req = RunRequest {
            url_or_query: Some("  sneakers ".into()),
            ..request()
        };
        let resolved = req.resolve().unwrap();
        assert_eq!(resolved.keyword, "sneakers");
        assert_eq!(resolved.country, "NL");
        assert!(resolved.active_only);
    }

    #[test]
    fn missing_keyword_is_a_config_error() {
        let result = request().resolve();
        assert!(
            matches!(result, Err(ConfigError::MissingParameter("keyword"))),
            "got: {result:?}"
        );
    }

    #[test]
    fn zero_limit_is_rejected() {
        let req = RunRequest {
            keyword: Some("x".into()),
            limit: 0,
            ..request()
        };
        assert!(matches!(
            req.resolve(),
            Err(ConfigError::InvalidParameter { field: "limit", .. })
        ));
    }

    #[test]
    fn malformed_date_is_rejected() {
        let req = RunRequest {
            keyword: Some("x".into()),
            date_min: Some("01-02-2025".into()),
            ..request()
        };
        assert!(matches!(
            req.resolve(),
            Err(ConfigError::InvalidParameter { field: "date_min", .. })
        ));
    }

    #[test]
    fn blank_category_override_is_dropped() {
        let req = RunRequest {
            keyword: Some("x".into()),
            required_categories: Some(vec![" ".into()]),
            ..request()
        };
        assert!(req.resolve().unwrap().required_categories.is_none());
    }
}
