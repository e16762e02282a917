// src/ingest/providers/mod.rs
pub mod devto;
pub mod github_trending;
pub mod npm_search;

use metrics::counter;
use reqwest::Client;

use crate::config::SourcesConfig;
use crate::ingest::types::{Source, TrendFetcher};

const USER_AGENT: &str = concat!("frontend-trend-sync/", env!("CARGO_PKG_VERSION"));

/// Shared client setup. No timeout on purpose: a hung source hangs the run.
pub(crate) fn http_client() -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(error = ?e, "http client builder failed, using defaults");
            Client::new()
        })
}

/// Log + count one failed sub-query; the fetch continues with the rest.
pub(crate) fn subquery_failed(source: Source, key: &str, err: &anyhow::Error) {
    tracing::warn!(target: "ingest", source = %source, query = key, error = ?err, "sub-query failed, skipping");
    counter!("ingest_subquery_errors_total", "source" => source.label()).increment(1);
}

/// The three production fetchers, in sync order.
pub fn build_fetchers(cfg: &SourcesConfig) -> Vec<Box<dyn TrendFetcher>> {
    vec![
        Box::new(github_trending::GithubTrendingFetcher::from_config(cfg)),
        Box::new(npm_search::NpmSearchFetcher::from_config(cfg)),
        Box::new(devto::DevToFetcher::from_config(cfg)),
    ]
}
