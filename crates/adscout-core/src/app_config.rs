use std::path::PathBuf;

/// Runtime settings shared by every pipeline run, loaded from the environment.
///
/// Per-run inputs (keyword, country, limit, …) live in
/// [`crate::RunRequest`]; this struct only carries operator-level knobs.
#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    /// Graph API access token for the ads archive. Optional at load time so
    /// that non-fetching commands work without it.
    pub meta_ads_token: Option<String>,
    pub graph_base_url: String,
    pub graph_version: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// Accepted CTA labels, compared case-insensitively.
    pub allowed_ctas: Vec<String>,
    /// Publisher category allow-list, compared case-sensitively. Empty means
    /// every category is allowed.
    pub allowed_page_categories: Vec<String>,
    pub require_category_strict: bool,
    pub excluded_page_name_regex: Option<String>,
    pub force_locale: String,
    /// Snapshot-attempt cap. `None` derives the cap from the run limit.
    pub max_scanned: Option<usize>,
    pub max_pages: usize,
    pub max_noprogress_pages: usize,
    pub concurrency: usize,
    pub per_ad_delay_ms: u64,
    pub block_stylesheets: bool,
    pub storage_state_path: PathBuf,
    pub chrome_path: Option<PathBuf>,
}

impl AppConfig {
    /// Locale in cookie/query form, e.g. `nl-NL` becomes `nl_NL`.
    #[must_use]
    pub fn cookie_locale(&self) -> String {
        self.force_locale.replace('-', "_")
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field(
                "meta_ads_token",
                &self.meta_ads_token.as_ref().map(|_| "[redacted]"),
            )
            .field("graph_base_url", &self.graph_base_url)
            .field("graph_version", &self.graph_version)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("allowed_ctas", &self.allowed_ctas)
            .field("allowed_page_categories", &self.allowed_page_categories)
            .field("require_category_strict", &self.require_category_strict)
            .field("excluded_page_name_regex", &self.excluded_page_name_regex)
            .field("force_locale", &self.force_locale)
            .field("max_scanned", &self.max_scanned)
            .field("max_pages", &self.max_pages)
            .field("max_noprogress_pages", &self.max_noprogress_pages)
            .field("concurrency", &self.concurrency)
            .field("per_ad_delay_ms", &self.per_ad_delay_ms)
            .field("block_stylesheets", &self.block_stylesheets)
            .field("storage_state_path", &self.storage_state_path)
            .field("chrome_path", &self.chrome_path)
            .finish()
    }
}
