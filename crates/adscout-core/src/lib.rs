//! Shared domain types and configuration for adscout.

pub mod app_config;
pub mod category;
pub mod config;
pub mod cta;
pub mod error;
pub mod record;
pub mod request;

pub use app_config::AppConfig;
pub use category::{category_matches, split_category};
pub use config::{load_app_config, load_app_config_from_env};
pub use cta::{classify_cta, pick_cta, AcceptedCtas};
pub use error::ConfigError;
pub use record::{collapse_whitespace, ExtractedRecord, PublisherProfile};
pub use request::{parse_library_url, ResolvedRequest, RunRequest};
