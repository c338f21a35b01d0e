use thiserror::Error;

/// Errors raised while building configuration, before any run work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    /// No catalog access token was configured.
    #[error("catalog access token missing (set META_ADS_TOKEN)")]
    MissingCredential,

    /// A run request lacks a parameter the catalog query cannot do without.
    #[error("missing required run parameter: {0}")]
    MissingParameter(&'static str),

    #[error("invalid run parameter {field}: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}
