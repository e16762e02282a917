//! # Sync Engine
//! Reconciles ranked candidates against the store, one item at a time:
//! look up a matching row (URL first, then title + source), decide
//! insert / update / skip, apply, count.
//!
//! Failure policy: a failed lookup counts as "no match" (duplicate row over lost
//! data); a failed write is logged and not counted; an unusable edit timestamp
//! means "not eligible for update". Nothing here aborts the run.

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use metrics::counter;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::config::RunConfig;
use crate::ingest::ensure_metrics_described;
use crate::ingest::types::{CandidateItem, Source};
use crate::store::{NewRow, StoredRow, TrendStore};

const MS_PER_DAY: i64 = 86_400_000;

/// Per-source outcome counts for one run. Observational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounters {
    pub added: u32,
    pub updated: u32,
    pub skipped: u32,
}

impl RunCounters {
    pub fn merge(&mut self, other: RunCounters) {
        self.added += other.added;
        self.updated += other.updated;
        self.skipped += other.skipped;
    }

    /// True when the run neither added nor updated anything.
    pub fn nothing_changed(&self) -> bool {
        self.added == 0 && self.updated == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePolicy {
    pub update_existing: bool,
    pub min_days_for_update: u32,
}

impl From<&RunConfig> for UpdatePolicy {
    fn from(cfg: &RunConfig) -> Self {
        Self {
            update_existing: cfg.update_existing,
            min_days_for_update: cfg.min_days_for_update,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Insert,
    Update { id: String },
    Skip,
}

/// Whole days since the last edit, truncated toward zero from milliseconds.
pub fn diff_days(now: DateTime<Utc>, last_edited_at: DateTime<Utc>) -> i64 {
    now.signed_duration_since(last_edited_at).num_milliseconds() / MS_PER_DAY
}

/// `diffDays >= minDaysForUpdate`; a missing edit timestamp is never eligible.
pub fn update_eligible(row: &StoredRow, now: DateTime<Utc>, min_days_for_update: u32) -> bool {
    match row.last_edited_at {
        Some(ts) => diff_days(now, ts) >= i64::from(min_days_for_update),
        None => {
            warn!(target: "sync", id = %row.id, "row has no usable last-edited time, not updating");
            false
        }
    }
}

/// Pure decision for one candidate given its (optional) match.
pub fn decide(existing: Option<&StoredRow>, policy: UpdatePolicy, now: DateTime<Utc>) -> SyncAction {
    match existing {
        None => SyncAction::Insert,
        Some(row)
            if policy.update_existing
                && update_eligible(row, now, policy.min_days_for_update) =>
        {
            SyncAction::Update { id: row.id.clone() }
        }
        Some(_) => SyncAction::Skip,
    }
}

pub struct SyncEngine<'a, S: TrendStore + ?Sized> {
    store: &'a S,
    policy: UpdatePolicy,
}

impl<'a, S: TrendStore + ?Sized> SyncEngine<'a, S> {
    pub fn new(store: &'a S, policy: UpdatePolicy) -> Self {
        ensure_metrics_described();
        Self { store, policy }
    }

    async fn lookup(&self, source: Source, item: &CandidateItem) -> Result<Option<StoredRow>> {
        if let Some(row) = self.store.query_by_url(&item.url).await? {
            return Ok(Some(row));
        }
        self.store
            .query_by_title_contains_and_source(&item.title, source)
            .await
    }

    /// URL match first, then title-contains + source. Errors fail open to `None`.
    pub async fn find_existing(&self, source: Source, item: &CandidateItem) -> Option<StoredRow> {
        match self.lookup(source, item).await {
            Ok(found) => found,
            Err(e) => {
                error!(target: "sync", source = %source, title = %item.title, error = ?e, "match lookup failed, treating as new");
                counter!("sync_lookup_errors_total").increment(1);
                None
            }
        }
    }

    pub async fn sync(
        &self,
        source: Source,
        items: &[CandidateItem],
        run_date: NaiveDate,
    ) -> RunCounters {
        self.sync_at(source, items, run_date, Utc::now()).await
    }

    /// Items are processed strictly in order; higher-ranked items win the insert
    /// when several candidates resolve to the same row.
    pub async fn sync_at(
        &self,
        source: Source,
        items: &[CandidateItem],
        run_date: NaiveDate,
        now: DateTime<Utc>,
    ) -> RunCounters {
        info!(target: "sync", source = %source, items = items.len(), store = self.store.name(), "syncing");
        let mut counters = RunCounters::default();

        for item in items {
            let existing = self.find_existing(source, item).await;
            let description = item.description.clone().unwrap_or_default();

            let outcome = match decide(existing.as_ref(), self.policy, now) {
                SyncAction::Insert => {
                    let row = NewRow {
                        title: item.title.clone(),
                        url: item.url.clone(),
                        source,
                        date: run_date,
                        description,
                    };
                    match self.store.insert_row(row).await {
                        Ok(_) => {
                            info!(target: "sync", source = %source, title = %item.title, "added");
                            counters.added += 1;
                            "added"
                        }
                        Err(e) => {
                            error!(target: "sync", source = %source, title = %item.title, error = ?e, "insert failed");
                            "failed"
                        }
                    }
                }
                SyncAction::Update { id } => {
                    match self.store.update_row(&id, run_date, &description).await {
                        Ok(()) => {
                            info!(target: "sync", source = %source, title = %item.title, "updated");
                            counters.updated += 1;
                            "updated"
                        }
                        Err(e) => {
                            error!(target: "sync", source = %source, title = %item.title, error = ?e, "update failed");
                            "failed"
                        }
                    }
                }
                SyncAction::Skip => {
                    debug!(target: "sync", source = %source, title = %item.title, "duplicate, skipped");
                    counters.skipped += 1;
                    "skipped"
                }
            };
            counter!("sync_rows_total", "source" => source.label(), "outcome" => outcome)
                .increment(1);
        }

        info!(
            target: "sync",
            source = %source,
            added = counters.added,
            updated = counters.updated,
            skipped = counters.skipped,
            "source done"
        );
        counters
    }
}
