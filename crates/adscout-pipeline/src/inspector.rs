//! The per-ad browser work the controller delegates: snapshot visits on
//! pooled sessions and publisher profile lookups on a dedicated one.

use std::sync::Arc;

use adscout_browser::{
    extract_snapshot, scrape_profile, BrowserError, ConsentCache, PageSession, SnapshotBits,
};
use adscout_core::PublisherProfile;
use async_trait::async_trait;
use tokio::sync::Mutex;

#[async_trait]
pub trait AdInspector: Send + Sync + 'static {
    /// Session type held by the controller's pool.
    type Session: Send + Sync + 'static;

    /// Visits one snapshot page. Never fails; missing data is `None`.
    async fn snapshot(&self, session: &Self::Session, snapshot_url: &str) -> SnapshotBits;

    /// Looks up one publisher profile.
    async fn profile(&self, publisher_id: &str) -> Result<PublisherProfile, BrowserError>;
}

/// [`AdInspector`] backed by real page sessions.
///
/// All profile lookups share one session behind an async mutex; the consent
/// host cache is shared with the snapshot sessions.
pub struct BrowserInspector<P> {
    profile_session: Mutex<P>,
    consent: Arc<ConsentCache>,
    cookie_locale: String,
}

impl<P: PageSession> BrowserInspector<P> {
    #[must_use]
    pub fn new(profile_session: P, consent: Arc<ConsentCache>, cookie_locale: &str) -> Self {
        Self {
            profile_session: Mutex::new(profile_session),
            consent,
            cookie_locale: cookie_locale.to_owned(),
        }
    }
}

#[async_trait]
impl<P> AdInspector for BrowserInspector<P>
where
    P: PageSession + 'static,
{
    type Session = P;

    async fn snapshot(&self, session: &P, snapshot_url: &str) -> SnapshotBits {
        extract_snapshot(session, &self.consent, snapshot_url, &self.cookie_locale).await
    }

    async fn profile(&self, publisher_id: &str) -> Result<PublisherProfile, BrowserError> {
        let session = self.profile_session.lock().await;
        scrape_profile(&*session, &self.consent, publisher_id, &self.cookie_locale).await
    }
}
