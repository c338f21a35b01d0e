//! Browser-side extraction for adscout.
//!
//! Everything here is written against the [`PageSession`] trait; the Chrome
//! implementation in [`chrome`] is the only part that talks CDP.

pub mod chrome;
pub mod consent;
pub mod error;
pub mod links;
pub mod profile;
pub mod session;
pub mod snapshot;
pub mod storage;

#[cfg(test)]
mod testing;

pub use chrome::{find_chrome, ChromeBrowser, ChromePage, ChromeSettings};
pub use consent::{ensure_consent, ConsentCache};
pub use error::BrowserError;
pub use links::{pick_product_url, unwrap_redirect};
pub use profile::{fallback_profile_url, parse_profile_text, profile_url, scrape_profile};
pub use session::{FrameRef, PageSession};
pub use snapshot::{extract_snapshot, with_locale, SnapshotBits};
pub use storage::{StorageState, StoredCookie};
