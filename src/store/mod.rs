// src/store/mod.rs
//! Store adapter: the persisted table the sync engine reads and writes.

pub mod memory;
pub mod notion;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};

use crate::ingest::types::Source;

/// A persisted trend row. `last_edited_at` is maintained by the store;
/// `None` means the store gave us nothing usable for it. `source` is `None`
/// for hand-edited rows whose select is empty or carries an unknown label.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub source: Option<Source>,
    /// Last-seen date.
    pub date: NaiveDate,
    pub description: String,
    pub last_edited_at: Option<DateTime<Utc>>,
}

/// Fields for a new row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRow {
    pub title: String,
    pub url: String,
    pub source: Source,
    pub date: NaiveDate,
    pub description: String,
}

#[async_trait::async_trait]
pub trait TrendStore: Send + Sync {
    async fn query_by_url(&self, url: &str) -> Result<Option<StoredRow>>;

    /// Rows whose title contains `title` and whose source matches. First hit wins.
    async fn query_by_title_contains_and_source(
        &self,
        title: &str,
        source: Source,
    ) -> Result<Option<StoredRow>>;

    async fn insert_row(&self, row: NewRow) -> Result<StoredRow>;

    /// Refresh the last-seen date and description; title/url/source stay.
    async fn update_row(&self, id: &str, date: NaiveDate, description: &str) -> Result<()>;

    fn name(&self) -> &'static str;
}
