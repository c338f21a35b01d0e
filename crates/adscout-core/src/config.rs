use std::path::PathBuf;

use crate::app_config::AppConfig;
use crate::ConfigError;

pub const DEFAULT_ALLOWED_CTA: &str = "Shop Now,Shop Nu,Shoppen";
pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_GRAPH_VERSION: &str = "v23.0";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.trim().parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.trim().parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.trim()
            .parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let parse_flag = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match optional(var) {
            None => Ok(default),
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: format!("expected a boolean, got \"{raw}\""),
            }),
        }
    };

    let log_level = or_default("ADSCOUT_LOG_LEVEL", "info");
    let meta_ads_token = optional("META_ADS_TOKEN");
    let graph_base_url = or_default("ADSCOUT_GRAPH_BASE_URL", DEFAULT_GRAPH_BASE_URL);
    let graph_version = or_default("ADSCOUT_GRAPH_VERSION", DEFAULT_GRAPH_VERSION);

    let request_timeout_secs = parse_u64("ADSCOUT_REQUEST_TIMEOUT_SECS", "25")?;
    let max_retries = parse_u32("ADSCOUT_MAX_RETRIES", "2")?;
    let retry_backoff_ms = parse_u64("ADSCOUT_RETRY_BACKOFF_MS", "500")?;

    let allowed_ctas = split_list(&or_default("ADSCOUT_ALLOWED_CTA", DEFAULT_ALLOWED_CTA));
    let allowed_page_categories = split_list(&or_default("ADSCOUT_ALLOWED_PAGE_CATEGORIES", ""));
    let require_category_strict = parse_flag("ADSCOUT_REQUIRE_CATEGORY_STRICT", true)?;

    let excluded_page_name_regex = optional("ADSCOUT_EXCLUDED_PAGE_NAME_REGEX");
    if let Some(pattern) = &excluded_page_name_regex {
        regex::Regex::new(pattern).map_err(|e| ConfigError::InvalidEnvVar {
            var: "ADSCOUT_EXCLUDED_PAGE_NAME_REGEX".to_string(),
            reason: e.to_string(),
        })?;
    }

    let force_locale = or_default("ADSCOUT_FORCE_LOCALE", "nl-NL");

    let max_scanned = match optional("ADSCOUT_MAX_SCANNED") {
        None => None,
        Some(_) => Some(parse_usize("ADSCOUT_MAX_SCANNED", "0")?),
    };
    let max_pages = parse_usize("ADSCOUT_MAX_PAGES", "40")?;
    let max_noprogress_pages = parse_usize("ADSCOUT_MAX_NOPROGRESS_PAGES", "5")?;
    let concurrency = parse_usize("ADSCOUT_CONCURRENCY", "3")?.max(1);
    let per_ad_delay_ms = parse_u64("ADSCOUT_PER_AD_DELAY_MS", "0")?;
    let block_stylesheets = parse_flag("ADSCOUT_BLOCK_STYLESHEETS", true)?;

    let storage_state_path = PathBuf::from(or_default(
        "ADSCOUT_STORAGE_STATE_PATH",
        "./storage/fb-state.json",
    ));
    let chrome_path = optional("ADSCOUT_CHROME_PATH").map(PathBuf::from);

    Ok(AppConfig {
        log_level,
        meta_ads_token,
        graph_base_url,
        graph_version,
        request_timeout_secs,
        max_retries,
        retry_backoff_ms,
        allowed_ctas,
        allowed_page_categories,
        require_category_strict,
        excluded_page_name_regex,
        force_locale,
        max_scanned,
        max_pages,
        max_noprogress_pages,
        concurrency,
        per_ad_delay_ms,
        block_stylesheets,
        storage_state_path,
        chrome_path,
    })
}

/// Splits a comma-separated env value into trimmed, non-empty entries.
#[must_use]
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Accepts `1/0`, `true/false`, `yes/no`, `on/off` in any case.
fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
