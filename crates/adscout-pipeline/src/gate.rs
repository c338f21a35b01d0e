//! Per-publisher allow/deny decisions, memoized for the run.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use adscout_browser::profile_url;
use adscout_core::{category_matches, PublisherProfile};
use regex::Regex;

use crate::counters::RunCounters;
use crate::inspector::AdInspector;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Decides whether a publisher's ads are worth a snapshot visit.
///
/// Decisions and profiles are cached per publisher id and never recomputed
/// within a run. Profile fetches are serialized and double-checked against
/// the cache, so each publisher's profile is fetched at most once.
pub struct PublisherGate {
    allowed_categories: Vec<String>,
    require_category: bool,
    excluded_name: Option<Regex>,
    cookie_locale: String,
    decisions: Mutex<HashMap<String, bool>>,
    profiles: Mutex<HashMap<String, PublisherProfile>>,
    seen: Mutex<HashSet<String>>,
    fetch_lock: tokio::sync::Mutex<()>,
}

impl PublisherGate {
    #[must_use]
    pub fn new(
        allowed_categories: Vec<String>,
        require_category: bool,
        excluded_name: Option<Regex>,
        cookie_locale: &str,
    ) -> Self {
        Self {
            allowed_categories,
            require_category,
            excluded_name,
            cookie_locale: cookie_locale.to_owned(),
            decisions: Mutex::new(HashMap::new()),
            profiles: Mutex::new(HashMap::new()),
            seen: Mutex::new(HashSet::new()),
            fetch_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Registers `publisher_id` as seen; returns `true` the first time.
    fn first_sighting(&self, publisher_id: &str, counters: &Mutex<RunCounters>) -> bool {
        let fresh = locked(&self.seen).insert(publisher_id.to_owned());
        if fresh {
            locked(counters).unique_publishers += 1;
        }
        fresh
    }

    fn remember(&self, publisher_id: &str, allow: bool) -> bool {
        locked(&self.decisions).insert(publisher_id.to_owned(), allow);
        allow
    }

    /// Cached profile for `publisher_id`, fetching it on first use. A failed
    /// fetch degrades to an empty profile pointing at the default profile URL,
    /// which is cached as well.
    pub async fn profile_for<I>(&self, inspector: &I, publisher_id: &str) -> PublisherProfile
    where
        I: AdInspector + ?Sized,
    {
        let cached = locked(&self.profiles).get(publisher_id).cloned();
        if let Some(profile) = cached {
            return profile;
        }

        let _guard = self.fetch_lock.lock().await;
        let cached = locked(&self.profiles).get(publisher_id).cloned();
        if let Some(profile) = cached {
            return profile;
        }

        let profile = match inspector.profile(publisher_id).await {
            Ok(profile) => profile,
            Err(err) => {
                tracing::warn!(publisher_id, error = %err, "profile lookup failed");
                PublisherProfile::empty(
                    publisher_id,
                    profile_url(publisher_id, &self.cookie_locale),
                )
            }
        };
        locked(&self.profiles).insert(publisher_id.to_owned(), profile.clone());
        profile
    }

    /// Whether ads from this publisher should be visited.
    pub async fn decide_allow<I>(
        &self,
        inspector: &I,
        counters: &Mutex<RunCounters>,
        publisher_id: &str,
        publisher_name: &str,
    ) -> bool
    where
        I: AdInspector + ?Sized,
    {
        let cached = locked(&self.decisions).get(publisher_id).copied();
        if let Some(allow) = cached {
            return allow;
        }

        if let Some(pattern) = &self.excluded_name {
            if !publisher_name.is_empty() && pattern.is_match(publisher_name) {
                if self.first_sighting(publisher_id, counters) {
                    locked(counters).unique_name_rejected += 1;
                }
                tracing::debug!(publisher_id, publisher_name, "publisher excluded by name");
                return self.remember(publisher_id, false);
            }
        }

        let profile = self.profile_for(inspector, publisher_id).await;
        self.first_sighting(publisher_id, counters);

        let Some(category) = profile.category.as_deref() else {
            if self.require_category {
                locked(counters).unique_category_missing += 1;
                tracing::debug!(publisher_id, "publisher has no category");
                return self.remember(publisher_id, false);
            }
            return self.remember(publisher_id, true);
        };

        let raw_category = profile.raw_category_text.as_deref().unwrap_or(category);

        if category_matches(raw_category, &self.allowed_categories) {
            return self.remember(publisher_id, true);
        }

        {
            let mut counters = locked(counters);
            counters.unique_category_rejected += 1;
            counters.bump_category_rejection(raw_category);
        }
        tracing::debug!(publisher_id, category = raw_category, "publisher category not allowed");
        self.remember(publisher_id, false)
    }

    /// Number of publishers with a cached decision.
    #[cfg(test)]
    fn decided(&self) -> usize {
        locked(&self.decisions).len()
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
