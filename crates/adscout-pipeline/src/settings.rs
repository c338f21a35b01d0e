use std::time::Duration;

use adscout_core::{AcceptedCtas, AppConfig, ConfigError, ResolvedRequest};
use chrono::NaiveDate;
use regex::{Regex, RegexBuilder};

/// Multiplier for the default snapshot-attempt cap (`limit × 200`).
const ATTEMPTS_PER_RECORD: usize = 200;

/// Everything one run needs, merged from the environment config and the
/// run request. Request values take precedence.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub country: String,
    pub keyword: String,
    pub limit: usize,
    pub active_only: bool,
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub max_attempts: usize,
    pub max_pages: usize,
    pub max_noprogress_pages: usize,
    pub concurrency: usize,
    pub per_ad_delay: Duration,
    pub accepted_ctas: AcceptedCtas,
    /// Empty means every category is allowed.
    pub allowed_categories: Vec<String>,
    pub require_category_strict: bool,
    pub excluded_name: Option<Regex>,
    /// Locale in cookie form, e.g. `nl_NL`.
    pub cookie_locale: String,
}

impl PipelineSettings {
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidEnvVar`] if the publisher name exclusion
    /// pattern does not compile.
    pub fn new(config: &AppConfig, request: &ResolvedRequest) -> Result<Self, ConfigError> {
        let excluded_name = config
            .excluded_page_name_regex
            .as_deref()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ConfigError::InvalidEnvVar {
                        var: "ADSCOUT_EXCLUDED_PAGE_NAME_REGEX".to_string(),
                        reason: e.to_string(),
                    })
            })
            .transpose()?;

        Ok(Self {
            country: request.country.clone(),
            keyword: request.keyword.clone(),
            limit: request.limit,
            active_only: request.active_only,
            date_min: request.date_min,
            date_max: request.date_max,
            max_attempts: config
                .max_scanned
                .unwrap_or_else(|| request.limit.saturating_mul(ATTEMPTS_PER_RECORD)),
            max_pages: config.max_pages,
            max_noprogress_pages: config.max_noprogress_pages.max(1),
            concurrency: request.concurrency.unwrap_or(config.concurrency).max(1),
            per_ad_delay: Duration::from_millis(config.per_ad_delay_ms),
            accepted_ctas: AcceptedCtas::new(&config.allowed_ctas),
            allowed_categories: request
                .required_categories
                .clone()
                .unwrap_or_else(|| config.allowed_page_categories.clone()),
            require_category_strict: config.require_category_strict,
            excluded_name,
            cookie_locale: config.cookie_locale(),
        })
    }

    /// Catalog page size requested for this run; the catalog clamps it.
    #[must_use]
    pub fn page_size(&self) -> u32 {
        u32::try_from(self.limit).unwrap_or(u32::MAX)
    }
}
