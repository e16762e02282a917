//! Frontend trend sync: binary entrypoint.
//! Fetches trending repos, packages and articles, then syncs them into the
//! configured Notion database. Always exits 0; failures are logged.

use chrono::Utc;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use frontend_trend_sync::config::{dry_run_enabled, AppConfig};
use frontend_trend_sync::ingest::providers::build_fetchers;
use frontend_trend_sync::pipeline::run_once;
use frontend_trend_sync::store::{memory::InMemoryStore, notion::NotionStore, TrendStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("frontend_trend_sync=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

async fn run() -> anyhow::Result<()> {
    let cfg = AppConfig::load_default()?;
    let fetchers = build_fetchers(&cfg.sources);

    let store: Box<dyn TrendStore> = if dry_run_enabled() {
        tracing::info!("dry run: writes stay in memory");
        Box::new(InMemoryStore::new())
    } else {
        Box::new(NotionStore::from_config(&cfg.store)?)
    };

    let run_date = Utc::now().date_naive();
    run_once(&fetchers, store.as_ref(), &cfg.run, run_date).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    if let Err(e) = run().await {
        error!(error = ?e, "trend sync aborted");
    }
}
