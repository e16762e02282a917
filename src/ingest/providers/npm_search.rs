// src/ingest/providers/npm_search.rs
//! Package-trend fetcher: npm registry search per keyword, weighted toward popularity.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;

use crate::config::SourcesConfig;
use crate::ingest::scoring::{composite, freshness, ScoreWeights};
use crate::ingest::types::{CandidateItem, Source, TrendFetcher};
use crate::ingest::{finalize_pool, normalize_opt, normalize_text, per_query_size};

const PACKAGE_PAGE: &str = "https://www.npmjs.com/package";
// Registry score ranks; publish date only breaks ties (see rank_and_truncate).
const WEIGHTS: ScoreWeights = ScoreWeights::new(0.0, 1.0);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    objects: Vec<SearchObject>,
}

#[derive(Debug, Deserialize)]
struct SearchObject {
    package: Package,
    score: Option<Score>,
}

#[derive(Debug, Deserialize)]
struct Package {
    name: String,
    description: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Score {
    #[serde(rename = "final")]
    final_score: f64,
}

pub struct NpmSearchFetcher {
    base_url: String,
    keywords: Vec<String>,
    client: Client,
}

impl NpmSearchFetcher {
    pub fn new(base_url: impl Into<String>, keywords: Vec<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            keywords,
            client: super::http_client(),
        }
    }

    pub fn from_config(cfg: &SourcesConfig) -> Self {
        Self::new(cfg.npm_base_url.clone(), cfg.npm_keywords.clone())
    }

    async fn search(&self, keyword: &str, size: usize) -> Result<SearchResponse> {
        let url = format!("{}/-/v1/search", self.base_url);
        let size = size.to_string();
        self.client
            .get(&url)
            .query(&[
                ("text", keyword),
                ("size", size.as_str()),
                ("popularity", "1.0"),
                ("quality", "0.5"),
                ("maintenance", "0.5"),
            ])
            .send()
            .await
            .with_context(|| format!("npm search get text={keyword}"))?
            .error_for_status()
            .with_context(|| format!("npm search non-2xx text={keyword}"))?
            .json::<SearchResponse>()
            .await
            .with_context(|| format!("npm search json text={keyword}"))
    }

    pub async fn fetch_at(
        &self,
        limit: usize,
        max_age_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Vec<CandidateItem> {
        let size = per_query_size(limit, self.keywords.len(), 5);

        let mut pool = Vec::new();
        for kw in &self.keywords {
            match self.search(kw, size).await {
                Ok(resp) => pool.extend(
                    resp.objects
                        .into_iter()
                        .filter_map(|o| to_candidate(o, now, max_age_days)),
                ),
                Err(e) => super::subquery_failed(Source::PackageTrend, kw, &e),
            }
        }
        finalize_pool(Source::PackageTrend, pool, now, limit, max_age_days)
    }
}

fn to_candidate(
    o: SearchObject,
    now: DateTime<Utc>,
    max_age_days: Option<u32>,
) -> Option<CandidateItem> {
    let name = normalize_text(&o.package.name);
    if name.is_empty() {
        return None;
    }
    let published_at = o
        .package
        .date
        .as_deref()
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc));
    let popularity = o.score.map(|s| s.final_score).unwrap_or(0.0);
    let fresh = freshness(published_at, now, max_age_days);

    Some(CandidateItem {
        url: format!("{PACKAGE_PAGE}/{name}"),
        description: normalize_opt(o.package.description.as_deref())
            .or_else(|| Some("No description".to_string())),
        title: name,
        source: Source::PackageTrend,
        score: composite(fresh, popularity, &WEIGHTS),
        published_at,
    })
}

#[async_trait]
impl TrendFetcher for NpmSearchFetcher {
    async fn fetch(&self, limit: usize, max_age_days: Option<u32>) -> Result<Vec<CandidateItem>> {
        Ok(self.fetch_at(limit, max_age_days, Utc::now()).await)
    }

    fn source(&self) -> Source {
        Source::PackageTrend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_registry_object_shape() {
        let raw = r#"{
            "objects": [{
                "package": {"name": "@scope/ui-kit", "date": "2025-04-01T10:00:00.000Z"},
                "score": {"final": 0.72, "detail": {"popularity": 0.5}}
            }],
            "total": 1
        }"#;
        let resp: SearchResponse = serde_json::from_str(raw).unwrap();
        let c = to_candidate(resp.objects.into_iter().next().unwrap(), Utc::now(), None).unwrap();
        assert_eq!(c.url, "https://www.npmjs.com/package/@scope/ui-kit");
        assert_eq!(c.description.as_deref(), Some("No description"));
        assert!((c.score - 0.72).abs() < 1e-9);
        assert!(c.published_at.is_some());
    }
}
