use adscout_browser::BrowserError;
use adscout_catalog::CatalogError;
use adscout_core::ConfigError;
use thiserror::Error;

/// Errors that end a pipeline run. Per-ad failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The catalog could not deliver a page; records gathered so far are
    /// discarded.
    #[error("catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The browser could not be launched or a pooled page could not be
    /// opened.
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
}
