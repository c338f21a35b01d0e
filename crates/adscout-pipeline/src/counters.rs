use std::collections::BTreeMap;

use serde::Serialize;

/// Why a run stopped paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The requested number of records was collected.
    LimitReached,
    MaxPages,
    /// The snapshot-attempt cap was reached.
    AttemptCap,
    /// The catalog returned a page without ads.
    EmptyPage,
    /// The catalog returned the same cursor twice in a row.
    CursorStalled,
    /// The catalog returned no cursor for a further page.
    CursorExhausted,
    /// Too many consecutive pages added no records.
    NoProgress,
}

/// Run statistics, returned alongside the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    /// Ads read from the catalog and considered for dispatch.
    pub seen: usize,
    /// Snapshot visits started.
    pub attempted: usize,
    /// Ads skipped because their publisher was denied.
    pub pre_rejected: usize,
    /// Snapshots without a recognisable CTA.
    pub no_cta: usize,
    /// Snapshots whose CTA was recognised but not accepted, by label.
    pub rejected_by_policy: BTreeMap<String, usize>,
    pub accepted: usize,
    pub unique_publishers: usize,
    pub unique_name_rejected: usize,
    pub unique_category_missing: usize,
    pub unique_category_rejected: usize,
    /// Category-mismatch denials keyed by the publisher's raw category text.
    pub category_rejections: BTreeMap<String, usize>,
    pub pages_fetched: usize,
    pub stop_reason: Option<StopReason>,
}

impl RunCounters {
    pub(crate) fn bump_policy_rejection(&mut self, label: &str) {
        *self.rejected_by_policy.entry(label.to_owned()).or_insert(0) += 1;
    }

    pub(crate) fn bump_category_rejection(&mut self, raw_category: &str) {
        *self
            .category_rejections
            .entry(raw_category.to_owned())
            .or_insert(0) += 1;
    }
}
