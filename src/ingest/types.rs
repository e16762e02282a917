// src/ingest/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::fmt;

/// Where a trend item came from. Also the store's "source" column.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub enum Source {
    RepoTrend,
    PackageTrend,
    Article,
}

impl Source {
    /// Sync order used by the pipeline.
    pub const ALL: [Source; 3] = [Source::RepoTrend, Source::PackageTrend, Source::Article];

    /// Label written to the store (select option name).
    pub fn label(self) -> &'static str {
        match self {
            Source::RepoTrend => "GitHub",
            Source::PackageTrend => "NPM",
            Source::Article => "Dev.to",
        }
    }

    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|src| src.label().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A freshly fetched trend entry, not yet reconciled against the store.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateItem {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub source: Source,
    /// Source-specific composite; only comparable within one source.
    pub score: f64,
    pub published_at: Option<DateTime<Utc>>,
}

/// One source fetcher. Sub-query failures are logged and skipped inside `fetch`;
/// an `Err` means the whole fetcher blew up and aborts the run.
#[async_trait::async_trait]
pub trait TrendFetcher: Send + Sync {
    async fn fetch(&self, limit: usize, max_age_days: Option<u32>) -> Result<Vec<CandidateItem>>;
    fn source(&self) -> Source;
}
