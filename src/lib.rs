// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod ingest;
pub mod pipeline;
pub mod store;
pub mod sync;

// ---- Re-exports for stable public API ----
pub use crate::ingest::types::{CandidateItem, Source, TrendFetcher};
pub use crate::pipeline::{run_once, RunSummary};
pub use crate::store::{NewRow, StoredRow, TrendStore};
pub use crate::sync::{RunCounters, SyncEngine, UpdatePolicy};
