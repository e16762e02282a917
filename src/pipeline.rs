// src/pipeline.rs
//! One full run: fetch every source concurrently, then sync source by source.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::RunConfig;
use crate::ingest::{
    self,
    types::{CandidateItem, Source, TrendFetcher},
};
use crate::store::TrendStore;
use crate::sync::{RunCounters, SyncEngine, UpdatePolicy};

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RunSummary {
    pub fetched: usize,
    pub per_source: Vec<(Source, RunCounters)>,
    pub total: RunCounters,
}

impl RunSummary {
    pub fn counters_for(&self, source: Source) -> Option<RunCounters> {
        self.per_source
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, c)| *c)
    }
}

/// Sequential sync of already-fetched batches (no concurrent store writes).
pub async fn sync_batches<S: TrendStore + ?Sized>(
    store: &S,
    policy: UpdatePolicy,
    batches: &[(Source, Vec<CandidateItem>)],
    run_date: NaiveDate,
) -> RunSummary {
    let engine = SyncEngine::new(store, policy);
    let mut summary = RunSummary {
        fetched: batches.iter().map(|(_, items)| items.len()).sum(),
        ..RunSummary::default()
    };

    for (source, items) in batches {
        let counters = engine.sync(*source, items, run_date).await;
        summary.total.merge(counters);
        summary.per_source.push((*source, counters));
    }
    summary
}

/// Fetch all sources (joint await; any fetcher error aborts), then sync.
pub async fn run_once<S: TrendStore + ?Sized>(
    fetchers: &[Box<dyn TrendFetcher>],
    store: &S,
    cfg: &RunConfig,
    run_date: NaiveDate,
) -> Result<RunSummary> {
    info!(
        target: "sync",
        sources = fetchers.len(),
        items_per_source = cfg.items_per_source,
        max_days_ago = cfg.max_days_ago,
        "collecting frontend trends"
    );

    let batches = ingest::fetch_all(fetchers, cfg.items_per_source, cfg.max_days_ago).await?;
    let fetched: usize = batches.iter().map(|(_, items)| items.len()).sum();
    info!(target: "sync", fetched, "fetch complete");

    let summary = sync_batches(store, UpdatePolicy::from(cfg), &batches, run_date).await;
    log_summary(&summary);
    Ok(summary)
}

pub fn log_summary(summary: &RunSummary) {
    info!(
        target: "sync",
        added = summary.total.added,
        updated = summary.total.updated,
        skipped = summary.total.skipped,
        "store update complete"
    );
    if summary.total.nothing_changed() {
        warn!(
            target: "sync",
            "nothing was added or updated; config may be too strict (raise max_days_ago or lower min_days_for_update)"
        );
    }
}
