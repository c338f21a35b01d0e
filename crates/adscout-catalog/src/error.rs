use adscout_core::ConfigError;
use thiserror::Error;

/// Errors returned by the ads archive catalog client.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The client is missing configuration it needs before it can call out,
    /// typically the access token.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Graph API answered with a non-success status. `body` holds the
    /// start of the raw response for diagnosis.
    #[error("catalog API returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid catalog base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },
}
