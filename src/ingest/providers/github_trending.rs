// src/ingest/providers/github_trending.rs
//! Repo-trend fetcher: scrapes the GitHub trending page per language.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use reqwest::Client;
use scraper::{Html, Selector};

use crate::config::SourcesConfig;
use crate::ingest::scoring::{composite, saturating_ratio, ScoreWeights};
use crate::ingest::types::{CandidateItem, Source, TrendFetcher};
use crate::ingest::{finalize_pool, is_relevant, normalize_opt, normalize_text, per_query_size};

const REPO_BASE: &str = "https://github.com";
const STARS_SATURATION: f64 = 500.0;
const WEIGHTS: ScoreWeights = ScoreWeights::new(0.6, 0.4);

/// One row of the trending page, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingRepo {
    pub path: String,
    pub title: String,
    pub description: Option<String>,
    /// Stars gained in the selected period.
    pub stars: u64,
}

struct Selectors {
    row: Selector,
    link: Selector,
    heading: Selector,
    para: Selector,
    stars: Selector,
}

fn selectors() -> &'static Selectors {
    static SEL: OnceCell<Selectors> = OnceCell::new();
    SEL.get_or_init(|| Selectors {
        row: Selector::parse("article.Box-row").unwrap(),
        link: Selector::parse("h2 a").unwrap(),
        heading: Selector::parse("h2").unwrap(),
        para: Selector::parse("p").unwrap(),
        stars: Selector::parse("span.d-inline-block.float-sm-right").unwrap(),
    })
}

fn first_integer(s: &str) -> Option<u64> {
    static RE: OnceCell<regex::Regex> = OnceCell::new();
    let re = RE.get_or_init(|| regex::Regex::new(r"\d[\d,]*").unwrap());
    re.find(s)
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
}

/// Parse trending rows in page order. Rows without a repo link are skipped.
pub fn parse_trending_page(html: &str) -> Vec<TrendingRepo> {
    let doc = Html::parse_document(html);
    let sel = selectors();

    let mut out = Vec::new();
    for row in doc.select(&sel.row) {
        let Some(href) = row
            .select(&sel.link)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let path = href.trim().trim_start_matches('/').to_string();
        if path.is_empty() {
            continue;
        }
        let title = row
            .select(&sel.heading)
            .next()
            .map(|h| normalize_text(&h.text().collect::<String>()))
            .unwrap_or_else(|| path.clone());
        let description = row.select(&sel.para).next().and_then(|p| {
            let text: String = p.text().collect();
            normalize_opt(Some(text.as_str()))
        });
        let stars = row
            .select(&sel.stars)
            .next()
            .and_then(|s| first_integer(&s.text().collect::<String>()))
            .unwrap_or(0);

        out.push(TrendingRepo {
            path,
            title,
            description,
            stars,
        });
    }
    out
}

pub struct GithubTrendingFetcher {
    base_url: String,
    languages: Vec<String>,
    since: String,
    keywords: Vec<String>,
    client: Client,
}

impl GithubTrendingFetcher {
    pub fn new(
        base_url: impl Into<String>,
        languages: Vec<String>,
        since: impl Into<String>,
        keywords: Vec<String>,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            languages,
            since: since.into(),
            keywords,
            client: super::http_client(),
        }
    }

    pub fn from_config(cfg: &SourcesConfig) -> Self {
        Self::new(
            cfg.github_base_url.clone(),
            cfg.github_languages.clone(),
            cfg.github_since.clone(),
            cfg.relevance_keywords.clone(),
        )
    }

    async fn fetch_language(&self, lang: &str) -> Result<String> {
        let url = format!("{}/trending/{}", self.base_url, lang);
        self.client
            .get(&url)
            .query(&[("since", self.since.as_str())])
            .send()
            .await
            .with_context(|| format!("github trending get lang={lang}"))?
            .error_for_status()
            .with_context(|| format!("github trending non-2xx lang={lang}"))?
            .text()
            .await
            .with_context(|| format!("github trending body lang={lang}"))
    }

    pub async fn fetch_at(
        &self,
        limit: usize,
        max_age_days: Option<u32>,
        now: DateTime<Utc>,
    ) -> Vec<CandidateItem> {
        let per_lang = per_query_size(limit, self.languages.len(), 10);

        let mut pool = Vec::new();
        for lang in &self.languages {
            match self.fetch_language(lang).await {
                Ok(body) => {
                    let repos = parse_trending_page(&body);
                    pool.extend(
                        repos
                            .into_iter()
                            .take(per_lang)
                            .filter(|r| {
                                is_relevant(&r.title, r.description.as_deref(), &self.keywords)
                            })
                            .map(to_candidate),
                    );
                }
                Err(e) => super::subquery_failed(Source::RepoTrend, lang, &e),
            }
        }
        finalize_pool(Source::RepoTrend, pool, now, limit, max_age_days)
    }
}

fn to_candidate(r: TrendingRepo) -> CandidateItem {
    // Trending rows carry no publish date: freshness is 1.
    let popularity = saturating_ratio(r.stars as f64, STARS_SATURATION);
    CandidateItem {
        url: format!("{REPO_BASE}/{}", r.path),
        title: r.title,
        description: r.description,
        source: Source::RepoTrend,
        score: composite(1.0, popularity, &WEIGHTS),
        published_at: None,
    }
}

#[async_trait]
impl TrendFetcher for GithubTrendingFetcher {
    async fn fetch(&self, limit: usize, max_age_days: Option<u32>) -> Result<Vec<CandidateItem>> {
        Ok(self.fetch_at(limit, max_age_days, Utc::now()).await)
    }

    fn source(&self) -> Source {
        Source::RepoTrend
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <article class="Box-row">
        <h2 class="h3 lh-condensed"><a href="/vercel/next.js">
          vercel /
          next.js</a></h2>
        <p class="col-9">The React Framework</p>
        <span class="d-inline-block float-sm-right">1,204 stars today</span>
      </article>
      <article class="Box-row">
        <h2><span>no link</span></h2>
      </article>
      <article class="Box-row">
        <h2><a href="/tokio-rs/tokio">tokio-rs / tokio</a></h2>
      </article>
    </body></html>"#;

    #[test]
    fn parses_rows_and_skips_linkless() {
        let repos = parse_trending_page(PAGE);
        assert_eq!(repos.len(), 2);
        assert_eq!(repos[0].path, "vercel/next.js");
        assert_eq!(repos[0].title, "vercel / next.js");
        assert_eq!(repos[0].description.as_deref(), Some("The React Framework"));
        assert_eq!(repos[0].stars, 1204);
        assert_eq!(repos[1].stars, 0);
        assert!(repos[1].description.is_none());
    }

    #[test]
    fn candidate_url_and_score() {
        let c = to_candidate(TrendingRepo {
            path: "x/y".into(),
            title: "x / y".into(),
            description: None,
            stars: 250,
        });
        assert_eq!(c.url, "https://github.com/x/y");
        assert!((c.score - (0.6 + 0.4 * 0.5)).abs() < 1e-9);
    }
}
