//! Graph API ads archive client: pages of candidate ads for a country and
//! keyword, with cursor paging and transient-failure retries.

pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use client::{clamp_page_size, AdCatalog, CatalogClient, MAX_PAGE_SIZE, MIN_PAGE_SIZE};
pub use error::CatalogError;
pub use types::{CandidateAd, CatalogPage, PageQuery};
