//! The `scrape` command: maps flags onto a run request, runs the pipeline and
//! prints the outcome.

use adscout_core::{AppConfig, RunRequest};
use clap::Args;

/// Flags for one scrape run. Anything left unset falls back to values read
/// from `--url`, then to the built-in defaults.
#[derive(Debug, Args)]
pub struct ScrapeArgs {
    /// Ad Library search URL or a bare search phrase
    #[arg(long)]
    pub url: Option<String>,
    /// Search keyword
    #[arg(long)]
    pub keyword: Option<String>,
    /// Two-letter country code (e.g., NL)
    #[arg(long)]
    pub country: Option<String>,
    /// Maximum number of records to return
    #[arg(long, default_value = "25")]
    pub limit: usize,
    /// Include inactive ads
    #[arg(long)]
    pub all_statuses: bool,
    /// Earliest delivery date (YYYY-MM-DD)
    #[arg(long)]
    pub date_min: Option<String>,
    /// Latest delivery date (YYYY-MM-DD)
    #[arg(long)]
    pub date_max: Option<String>,
    /// Comma-separated publisher category allow-list, overriding the config
    #[arg(long, value_delimiter = ',')]
    pub categories: Option<Vec<String>>,
    /// Number of snapshot sessions, overriding the config
    #[arg(long)]
    pub concurrency: Option<usize>,
    /// Show the browser window
    #[arg(long)]
    pub headful: bool,
}

impl ScrapeArgs {
    pub fn into_request(self) -> RunRequest {
        RunRequest {
            url_or_query: self.url,
            country: self.country,
            keyword: self.keyword,
            limit: self.limit,
            active_only: self.all_statuses.then_some(false),
            date_min: self.date_min,
            date_max: self.date_max,
            required_categories: self.categories.map(|list| {
                list.into_iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty())
                    .collect()
            }),
            concurrency: self.concurrency,
            headless: !self.headful,
        }
    }
}

/// Runs the pipeline and writes the outcome to stdout as pretty JSON.
///
/// # Errors
///
/// Returns an error if the request is invalid, the token is missing, the
/// browser cannot start, or a catalog page cannot be fetched.
pub(crate) async fn run_scrape(config: &AppConfig, args: ScrapeArgs) -> anyhow::Result<()> {
    let request = args.into_request();
    let outcome = adscout_pipeline::run_request(config, &request).await?;

    tracing::info!(
        records = outcome.records.len(),
        stop_reason = ?outcome.counters.stop_reason,
        "scrape complete"
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
