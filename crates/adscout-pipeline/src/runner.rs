//! Wires the real catalog client and a Chrome browser into one pipeline run.

use std::sync::Arc;

use adscout_browser::{BrowserError, ChromeBrowser, ChromeSettings, ConsentCache};
use adscout_catalog::CatalogClient;
use adscout_core::{AppConfig, ConfigError, RunRequest};

use crate::controller::Pipeline;
use crate::error::PipelineError;
use crate::inspector::BrowserInspector;
use crate::pool::SessionPool;
use crate::settings::PipelineSettings;
use crate::RunOutcome;

/// Resolves `request`, launches Chrome and runs the pipeline once.
///
/// The browser is closed and its cookie state saved on every exit path.
///
/// # Errors
///
/// - [`PipelineError::Config`] for an unusable request or missing token;
///   raised before the browser is launched.
/// - [`PipelineError::Browser`] if Chrome cannot be launched or its pages
///   cannot be opened.
/// - [`PipelineError::Catalog`] if the catalog fails mid-run.
pub async fn run_request(
    config: &AppConfig,
    request: &RunRequest,
) -> Result<RunOutcome, PipelineError> {
    let resolved = request.resolve()?;
    let settings = PipelineSettings::new(config, &resolved)?;
    if config.meta_ads_token.is_none() {
        return Err(ConfigError::MissingCredential.into());
    }
    let catalog = Arc::new(CatalogClient::from_config(config)?);
    let chrome = ChromeSettings::from_config(config, resolved.headless);

    ChromeBrowser::run(chrome, |browser| async move {
        let consent = Arc::new(ConsentCache::new());
        let mut sessions = Vec::with_capacity(settings.concurrency);
        for _ in 0..settings.concurrency {
            sessions.push(browser.new_session().await?);
        }
        let profile_session = browser.new_session().await?;
        let inspector = Arc::new(BrowserInspector::new(
            profile_session,
            consent,
            &settings.cookie_locale,
        ));
        let pool = SessionPool::new(sessions)
            .ok_or_else(|| BrowserError::Launch("no browser sessions opened".to_owned()))?;

        Pipeline::new(catalog, inspector, pool, settings).run().await
    })
    .await
}
