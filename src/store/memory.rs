// src/store/memory.rs
//! In-process store used for dry runs and tests. Mirrors the Notion semantics
//! the sync engine relies on: exact URL lookup, case-insensitive title
//! `contains`, and a store-maintained `last_edited_at`.

use std::sync::Mutex;

use anyhow::{bail, Result};
use chrono::{DateTime, NaiveDate, Utc};

use super::{NewRow, StoredRow, TrendStore};
use crate::ingest::types::Source;

type Clock = Box<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Which calls should fail (tests exercise the sync engine's error paths).
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    pub lookup: bool,
    pub insert: bool,
    pub update: bool,
}

#[derive(Default)]
struct Inner {
    rows: Vec<StoredRow>,
    next_id: u64,
    faults: Faults,
}

pub struct InMemoryStore {
    inner: Mutex<Inner>,
    clock: Clock,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_clock(Utc::now)
    }

    pub fn with_clock<F>(clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            inner: Mutex::new(Inner::default()),
            clock: Box::new(clock),
        }
    }

    pub fn set_faults(&self, faults: Faults) {
        self.inner.lock().expect("store mutex poisoned").faults = faults;
    }

    /// Insert a row verbatim (keeps the given id and `last_edited_at`).
    pub fn seed(&self, row: StoredRow) {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        g.next_id += 1;
        g.rows.push(row);
    }

    pub fn rows(&self) -> Vec<StoredRow> {
        self.inner.lock().expect("store mutex poisoned").rows.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("store mutex poisoned").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Back-date (or forward-date) a row's last edit.
    pub fn set_last_edited(&self, id: &str, ts: Option<DateTime<Utc>>) -> bool {
        let mut g = self.inner.lock().expect("store mutex poisoned");
        match g.rows.iter_mut().find(|r| r.id == id) {
            Some(r) => {
                r.last_edited_at = ts;
                true
            }
            None => false,
        }
    }
}

#[async_trait::async_trait]
impl TrendStore for InMemoryStore {
    async fn query_by_url(&self, url: &str) -> Result<Option<StoredRow>> {
        let g = self.inner.lock().expect("store mutex poisoned");
        if g.faults.lookup {
            bail!("injected lookup failure");
        }
        Ok(g.rows.iter().find(|r| r.url == url).cloned())
    }

    async fn query_by_title_contains_and_source(
        &self,
        title: &str,
        source: Source,
    ) -> Result<Option<StoredRow>> {
        let g = self.inner.lock().expect("store mutex poisoned");
        if g.faults.lookup {
            bail!("injected lookup failure");
        }
        let needle = title.to_lowercase();
        Ok(g
            .rows
            .iter()
            .find(|r| r.source == Some(source) && r.title.to_lowercase().contains(&needle))
            .cloned())
    }

    async fn insert_row(&self, row: NewRow) -> Result<StoredRow> {
        let now = (self.clock)();
        let mut g = self.inner.lock().expect("store mutex poisoned");
        if g.faults.insert {
            bail!("injected insert failure");
        }
        g.next_id += 1;
        let stored = StoredRow {
            id: format!("row-{}", g.next_id),
            title: row.title,
            url: row.url,
            source: Some(row.source),
            date: row.date,
            description: row.description,
            last_edited_at: Some(now),
        };
        g.rows.push(stored.clone());
        Ok(stored)
    }

    async fn update_row(&self, id: &str, date: NaiveDate, description: &str) -> Result<()> {
        let now = (self.clock)();
        let mut g = self.inner.lock().expect("store mutex poisoned");
        if g.faults.update {
            bail!("injected update failure");
        }
        let Some(row) = g.rows.iter_mut().find(|r| r.id == id) else {
            bail!("no row with id {id}");
        };
        row.date = date;
        row.description = description.to_string();
        row.last_edited_at = Some(now);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
