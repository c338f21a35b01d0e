//! The pipeline controller: pages the catalog, screens publishers, fans ads
//! out to pooled browser sessions and decides when to stop.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use adscout_catalog::{AdCatalog, CandidateAd, PageQuery};
use adscout_core::{collapse_whitespace, ExtractedRecord, PublisherProfile};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{JoinError, JoinSet};
use tracing::Instrument;
use uuid::Uuid;

use crate::counters::{RunCounters, StopReason};
use crate::error::PipelineError;
use crate::gate::PublisherGate;
use crate::inspector::AdInspector;
use crate::pool::SessionPool;
use crate::settings::PipelineSettings;
use crate::RunOutcome;

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared by the controller and its in-flight ad tasks for one run.
struct RunContext {
    settings: PipelineSettings,
    gate: PublisherGate,
    counters: Mutex<RunCounters>,
    records: Mutex<Vec<ExtractedRecord>>,
}

impl RunContext {
    fn new(settings: PipelineSettings) -> Self {
        let gate = PublisherGate::new(
            settings.allowed_categories.clone(),
            settings.require_category_strict,
            settings.excluded_name.clone(),
            &settings.cookie_locale,
        );
        Self {
            settings,
            gate,
            counters: Mutex::new(RunCounters::default()),
            records: Mutex::new(Vec::new()),
        }
    }

    fn record_count(&self) -> usize {
        locked(&self.records).len()
    }

    fn attempted(&self) -> usize {
        locked(&self.counters).attempted
    }

    /// `true` once either the output limit or the attempt cap is reached.
    fn saturated(&self) -> bool {
        self.record_count() >= self.settings.limit
            || self.attempted() >= self.settings.max_attempts
    }
}

/// One configured discovery-and-extraction run.
pub struct Pipeline<C, I: AdInspector> {
    catalog: Arc<C>,
    inspector: Arc<I>,
    pool: Arc<SessionPool<I::Session>>,
    settings: PipelineSettings,
}

impl<C, I> Pipeline<C, I>
where
    C: AdCatalog,
    I: AdInspector,
{
    #[must_use]
    pub fn new(
        catalog: Arc<C>,
        inspector: Arc<I>,
        pool: SessionPool<I::Session>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            catalog,
            inspector,
            pool: Arc::new(pool),
            settings,
        }
    }

    #[must_use]
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Runs until a stop condition fires and returns at most `limit` records
    /// in completion order, plus the run counters.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Catalog`] if a catalog page cannot be fetched.
    /// Records gathered before the failure are discarded.
    pub async fn run(&self) -> Result<RunOutcome, PipelineError> {
        let span = tracing::info_span!(
            "pipeline_run",
            run_id = %Uuid::new_v4(),
            country = %self.settings.country,
            keyword = %self.settings.keyword,
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<RunOutcome, PipelineError> {
        let ctx = Arc::new(RunContext::new(self.settings.clone()));
        let settings = &ctx.settings;
        let query = PageQuery {
            country: settings.country.clone(),
            search_terms: settings.keyword.clone(),
            active_only: settings.active_only,
            page_size: settings.page_size(),
            date_min: settings.date_min,
            date_max: settings.date_max,
        };

        tracing::info!(
            limit = settings.limit,
            concurrency = settings.concurrency,
            max_attempts = settings.max_attempts,
            max_pages = settings.max_pages,
            "pipeline run starting"
        );

        let mut after: Option<String> = None;
        let mut pages = 0usize;
        let mut no_progress = 0usize;
        let mut last_len = 0usize;

        let stop = loop {
            if ctx.record_count() >= settings.limit {
                break StopReason::LimitReached;
            }
            if pages >= settings.max_pages {
                break StopReason::MaxPages;
            }
            if ctx.attempted() >= settings.max_attempts {
                break StopReason::AttemptCap;
            }

            pages += 1;
            let page = self.catalog.fetch_page(&query, after.as_deref()).await?;
            locked(&ctx.counters).pages_fetched = pages;
            tracing::info!(
                page = pages,
                ads = page.ads.len(),
                after = after.as_deref().unwrap_or("-"),
                "catalog page fetched"
            );

            if page.ads.is_empty() {
                break StopReason::EmptyPage;
            }
            if page.next_cursor.is_some() && page.next_cursor == after {
                break StopReason::CursorStalled;
            }

            self.process_page(&ctx, page.ads).await;

            let len = ctx.record_count();
            if len >= settings.limit {
                break StopReason::LimitReached;
            }
            if len == last_len {
                no_progress += 1;
                if no_progress >= settings.max_noprogress_pages {
                    break StopReason::NoProgress;
                }
            } else {
                no_progress = 0;
                last_len = len;
            }

            match page.next_cursor {
                Some(cursor) => after = Some(cursor),
                None => break StopReason::CursorExhausted,
            }
        };

        let mut records = std::mem::take(&mut *locked(&ctx.records));
        records.truncate(settings.limit);
        let counters = {
            let mut counters = locked(&ctx.counters);
            counters.stop_reason = Some(stop);
            counters.accepted = records.len();
            counters.clone()
        };

        tracing::info!(
            stop_reason = ?stop,
            records = records.len(),
            limit = settings.limit,
            pages = counters.pages_fetched,
            seen = counters.seen,
            attempted = counters.attempted,
            pre_rejected = counters.pre_rejected,
            no_cta = counters.no_cta,
            rejected_by_policy = ?counters.rejected_by_policy,
            unique_publishers = counters.unique_publishers,
            unique_name_rejected = counters.unique_name_rejected,
            unique_category_missing = counters.unique_category_missing,
            unique_category_rejected = counters.unique_category_rejected,
            "pipeline run finished"
        );

        Ok(RunOutcome { records, counters })
    }

    /// Screens and dispatches one page of ads, then waits for every task.
    async fn process_page(&self, ctx: &Arc<RunContext>, ads: Vec<CandidateAd>) {
        let concurrency = ctx.settings.concurrency;
        let mut in_flight = JoinSet::new();

        for ad in ads {
            if ctx.saturated() {
                break;
            }
            locked(&ctx.counters).seen += 1;

            let allowed = ctx
                .gate
                .decide_allow(
                    self.inspector.as_ref(),
                    &ctx.counters,
                    &ad.publisher_id,
                    &ad.publisher_name,
                )
                .await;
            if !allowed {
                locked(&ctx.counters).pre_rejected += 1;
                continue;
            }

            while in_flight.len() >= concurrency {
                if let Some(joined) = in_flight.join_next().await {
                    log_task_failure(joined);
                }
            }
            if ctx.saturated() {
                break;
            }

            locked(&ctx.counters).attempted += 1;
            in_flight.spawn(inspect_ad(
                Arc::clone(ctx),
                Arc::clone(&self.inspector),
                self.pool.next(),
                ad,
            ));
        }

        while let Some(joined) = in_flight.join_next().await {
            log_task_failure(joined);
        }
    }
}

fn log_task_failure(joined: Result<(), JoinError>) {
    if let Err(err) = joined {
        tracing::debug!(error = %err, "ad task failed");
    }
}

/// Visits one ad's snapshot and appends a record if its CTA is accepted.
async fn inspect_ad<I: AdInspector>(
    ctx: Arc<RunContext>,
    inspector: Arc<I>,
    session: Arc<AsyncMutex<I::Session>>,
    ad: CandidateAd,
) {
    let bits = {
        let session = session.lock().await;
        inspector.snapshot(&session, &ad.snapshot_url).await
    };

    match bits.cta_text.as_deref() {
        None => {
            locked(&ctx.counters).no_cta += 1;
            tracing::debug!(ad_id = %ad.id, "no CTA on snapshot");
        }
        Some(label) if !ctx.settings.accepted_ctas.accepts(label) => {
            locked(&ctx.counters).bump_policy_rejection(label);
            tracing::debug!(ad_id = %ad.id, label, "CTA not accepted");
        }
        Some(label) => {
            let profile = ctx.gate.profile_for(inspector.as_ref(), &ad.publisher_id).await;
            let record = build_record(&ctx.settings, &ad, label, bits.product_url.clone(), &profile);
            locked(&ctx.records).push(record);
            tracing::debug!(ad_id = %ad.id, label, "record accepted");
        }
    }

    if !ctx.settings.per_ad_delay.is_zero() {
        tokio::time::sleep(ctx.settings.per_ad_delay).await;
    }
}

fn build_record(
    settings: &PipelineSettings,
    ad: &CandidateAd,
    cta_label: &str,
    product_url: Option<String>,
    profile: &PublisherProfile,
) -> ExtractedRecord {
    ExtractedRecord {
        snapshot_url: ad.snapshot_url.clone(),
        publisher_name: ad.publisher_name.clone(),
        country: settings.country.clone(),
        reach: ad.reach_metric,
        product_url,
        start_date: ad.start_date(),
        media_type: ad
            .media_type
            .clone()
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "UNKNOWN".to_owned()),
        platforms: ad.platforms.join(","),
        keyword: settings.keyword.clone(),
        ad_id: ad.id.clone(),
        cta_text: cta_label.to_owned(),
        active_status: ad.active_status.clone().unwrap_or_default(),
        likes: profile.likes_text.as_deref().map(collapse_whitespace),
        followers: profile.followers_text.as_deref().map(collapse_whitespace),
        category: profile.display_category(),
        profile_url: profile.profile_url.clone(),
    }
}
