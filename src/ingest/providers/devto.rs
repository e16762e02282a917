// src/ingest/providers/devto.rs
//! Article fetcher: rising articles per tag from the dev.to public API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::config::SourcesConfig;
use crate::ingest::scoring::{composite, freshness, saturating_ratio, ScoreWeights};
use crate::ingest::types::{CandidateItem, Source, TrendFetcher};
use crate::ingest::{finalize_pool, normalize_opt, normalize_text, per_query_size};

const SITE: &str = "https://dev.to";
const REACTIONS_SATURATION: f64 = 50.0;
const WEIGHTS: ScoreWeights = ScoreWeights::new(0.6, 0.4);

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    path: Option<String>,
    published_at: Option<String>,
    public_reactions_count: Option<u64>,
}

pub struct DevToFetcher {
    base_url: String,
    tags: Vec<String>,
    client: Client,
}

impl DevToFetcher {
    pub fn new(base_url: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tags,
            client: super::http_client(),
        }
    }

    pub fn from_config(cfg: &SourcesConfig) -> Self {
        Self::new(cfg.devto_base_url.clone(), cfg.devto_tags.clone())
    }

    async fn fetch_tag(&self, tag: &str, days: u32, per_page: usize) -> Result<Vec<Article>> {
        let url = format!("{}/api/articles", self.base_url);
        let top = days.to_string();
        let per_page = per_page.to_string();
        self.client
            .get(&url)
            .query(&[
                ("tag", tag),
                ("top", top.as_str()),
                ("state", "rising"),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("dev.to get tag={tag}"))?
            .error_for_status()
            .with_context(|| format!("dev.to non-2xx tag={tag}"))?
            .json::<Vec<Article>>()
            .await
            .with_context(|| format!("dev.to json tag={tag}"))
    }

    /// Same as `fetch`, with an explicit clock.
    pub async fn fetch_at(
        &self,
        limit: usize,
        max_age_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Vec<CandidateItem> {
        let per_page = per_query_size(limit, self.tags.len(), 5);
        let days = max_age_days.unwrap_or(7).max(1);

        let mut pool = Vec::new();
        for tag in &self.tags {
            match self.fetch_tag(tag, days, per_page).await {
                Ok(articles) => {
                    pool.extend(
                        articles
                            .into_iter()
                            .take(per_page)
                            .filter_map(|a| to_candidate(a, tag, now, max_age_days)),
                    );
                }
                Err(e) => super::subquery_failed(Source::Article, tag, &e),
            }
        }
        finalize_pool(Source::Article, pool, now, limit, max_age_days)
    }
}

fn to_candidate(
    a: Article,
    tag: &str,
    now: DateTime<Utc>,
    max_age_days: Option<u32>,
) -> Option<CandidateItem> {
    let title = normalize_text(a.title.as_deref()?);
    let url = a
        .url
        .filter(|u| !u.trim().is_empty())
        .or_else(|| a.path.map(|p| format!("{SITE}{p}")))?;
    if title.is_empty() {
        return None;
    }
    let published_at = a
        .published_at
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let fresh = freshness(published_at, now, max_age_days);
    let reactions = a.public_reactions_count.unwrap_or(0) as f64;
    let popularity = saturating_ratio(reactions, REACTIONS_SATURATION);

    Some(CandidateItem {
        title,
        description: normalize_opt(a.description.as_deref())
            .or_else(|| Some(format!("Trending {tag} article"))),
        url,
        source: Source::Article,
        score: composite(fresh, popularity, &WEIGHTS),
        published_at,
    })
}

#[async_trait]
impl TrendFetcher for DevToFetcher {
    async fn fetch(&self, limit: usize, max_age_days: Option<u32>) -> Result<Vec<CandidateItem>> {
        Ok(self.fetch_at(limit, max_age_days, Utc::now()).await)
    }

    fn source(&self) -> Source {
        Source::Article
    }
}
