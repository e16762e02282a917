// src/ingest/mod.rs
pub mod providers;
pub mod scoring;
pub mod types;

use crate::ingest::types::{CandidateItem, Source, TrendFetcher};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use metrics::{counter, describe_counter};
use once_cell::sync::OnceCell;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Store-side cap for free text (Notion rich text limit).
pub const MAX_TEXT_CHARS: usize = 2000;

/// Fetchers gather roughly this many times `limit` before ranking.
pub const OVERSUPPLY_FACTOR: usize = 3;

/// Frontend relevance keywords (title/description substring, case-insensitive).
pub const FRONTEND_KEYWORDS: &[&str] = &[
    "react",
    "vue",
    "angular",
    "svelte",
    "frontend",
    "ui",
    "component",
    "web",
    "css",
    "html",
    "javascript",
    "typescript",
];

/// One-time metrics registration.
pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "ingest_candidates_total",
            "Candidates returned by fetchers after ranking."
        );
        describe_counter!(
            "ingest_subquery_errors_total",
            "Failed sub-queries (one tag/keyword/language)."
        );
        describe_counter!(
            "ingest_dedup_total",
            "Candidates dropped as URL or near-duplicate title."
        );
        describe_counter!(
            "sync_rows_total",
            "Sync outcomes per source (added/updated/skipped/failed)."
        );
        describe_counter!(
            "sync_lookup_errors_total",
            "Store match lookups that failed and fell open to insert."
        );
    });
}

/// Normalize scraped text: decode entities, strip tags, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<regex::Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Collapse whitespace
    static RE_WS: OnceCell<regex::Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 4) Length cap
    if out.chars().count() > MAX_TEXT_CHARS {
        out = out.chars().take(MAX_TEXT_CHARS).collect();
    }
    out
}

/// Normalized optional text; empty after normalization means absent.
pub fn normalize_opt(s: Option<&str>) -> Option<String> {
    s.map(normalize_text).filter(|t| !t.is_empty())
}

pub fn is_relevant(title: &str, description: Option<&str>, keywords: &[String]) -> bool {
    let title = title.to_lowercase();
    let desc = description.unwrap_or_default().to_lowercase();
    keywords.iter().any(|k| {
        let k = k.to_lowercase();
        title.contains(&k) || desc.contains(&k)
    })
}

/// Two titles are the same item if the longer one contains the first 80%
/// (by chars, floored) of the shorter one, case-insensitive. Equal-length
/// titles are checked both ways so the answer never depends on argument order.
pub fn is_near_duplicate_title(a: &str, b: &str) -> bool {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let (a_len, b_len) = (a.chars().count(), b.chars().count());
    match a_len.cmp(&b_len) {
        Ordering::Less => longer_contains_prefix(&a, &b),
        Ordering::Greater => longer_contains_prefix(&b, &a),
        Ordering::Equal => longer_contains_prefix(&a, &b) || longer_contains_prefix(&b, &a),
    }
}

fn longer_contains_prefix(shorter: &str, longer: &str) -> bool {
    let prefix_len = shorter.chars().count() * 8 / 10;
    if prefix_len == 0 {
        return shorter == longer;
    }
    let prefix: String = shorter.chars().take(prefix_len).collect();
    longer.contains(&prefix)
}

/// How titles are compared when deduplicating a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleMatch {
    /// 80% prefix rule, for free-form headlines.
    Near,
    /// Identical titles only (package names).
    Exact,
}

impl TitleMatch {
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::PackageTrend => TitleMatch::Exact,
            Source::RepoTrend | Source::Article => TitleMatch::Near,
        }
    }

    fn same(self, a: &str, b: &str) -> bool {
        match self {
            TitleMatch::Near => is_near_duplicate_title(a, b),
            TitleMatch::Exact => a == b,
        }
    }
}

/// Keeps the first item per URL and per near-duplicate title, in input order.
/// Returns the survivors and how many were dropped.
pub fn dedup_candidates(items: Vec<CandidateItem>) -> (Vec<CandidateItem>, usize) {
    dedup_candidates_by(items, TitleMatch::Near)
}

pub fn dedup_candidates_by(
    items: Vec<CandidateItem>,
    titles: TitleMatch,
) -> (Vec<CandidateItem>, usize) {
    let mut seen_urls: HashSet<String> = HashSet::new();
    let mut keep: Vec<CandidateItem> = Vec::with_capacity(items.len());
    let mut dropped = 0usize;

    for it in items {
        if seen_urls.contains(&it.url)
            || keep
                .iter()
                .any(|k| titles.same(&k.title, &it.title))
        {
            dropped += 1;
            continue;
        }
        seen_urls.insert(it.url.clone());
        keep.push(it);
    }
    (keep, dropped)
}

/// Drops dated items older than `max_age_days`; undated items always pass.
pub fn drop_older_than(
    items: Vec<CandidateItem>,
    now: DateTime<Utc>,
    max_age_days: Option<u32>,
) -> Vec<CandidateItem> {
    let Some(days) = max_age_days else {
        return items;
    };
    let cutoff = now - Duration::days(i64::from(days));
    items
        .into_iter()
        .filter(|it| it.published_at.is_none_or(|ts| ts >= cutoff))
        .collect()
}

/// Score descending, newer publish date as tiebreak, then truncate.
pub fn rank_and_truncate(mut items: Vec<CandidateItem>, limit: usize) -> Vec<CandidateItem> {
    items.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| match (a.published_at, b.published_at) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            })
    });
    items.truncate(limit);
    items
}

/// Shared tail of every fetcher: dedup, age filter, rank, truncate.
/// Package names are only deduplicated on exact equality.
pub fn finalize_pool(
    source: Source,
    pool: Vec<CandidateItem>,
    now: DateTime<Utc>,
    limit: usize,
    max_age_days: Option<u32>,
) -> Vec<CandidateItem> {
    ensure_metrics_described();
    let (unique, dropped) = dedup_candidates_by(pool, TitleMatch::for_source(source));
    counter!("ingest_dedup_total", "source" => source.label()).increment(dropped as u64);
    let fresh = drop_older_than(unique, now, max_age_days);
    let ranked = rank_and_truncate(fresh, limit);
    counter!("ingest_candidates_total", "source" => source.label())
        .increment(ranked.len() as u64);
    ranked
}

/// Page size per sub-query so the whole pool reaches `OVERSUPPLY_FACTOR * limit`.
pub fn per_query_size(limit: usize, sub_queries: usize, floor: usize) -> usize {
    let target = limit.saturating_mul(OVERSUPPLY_FACTOR);
    target.div_ceil(sub_queries.max(1)).max(floor)
}

/// Only the article source is age-bounded.
pub fn max_age_for(source: Source, max_days_ago: u32) -> Option<u32> {
    match source {
        Source::Article => Some(max_days_ago),
        Source::RepoTrend | Source::PackageTrend => None,
    }
}

/// Runs every fetcher concurrently and waits for all of them.
/// Any top-level fetcher error aborts the whole batch.
pub async fn fetch_all(
    fetchers: &[Box<dyn TrendFetcher>],
    limit: usize,
    max_days_ago: u32,
) -> Result<Vec<(Source, Vec<CandidateItem>)>> {
    ensure_metrics_described();

    let futs = fetchers.iter().map(|f| async move {
        let source = f.source();
        let items = f.fetch(limit, max_age_for(source, max_days_ago)).await?;
        tracing::info!(target: "ingest", source = %source, count = items.len(), "fetched");
        Ok::<_, anyhow::Error>((source, items))
    });
    let mut out = futures::future::try_join_all(futs).await?;
    out.sort_by_key(|(source, _)| *source);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(title: &str, url: &str, score: f64) -> CandidateItem {
        CandidateItem {
            title: title.into(),
            description: None,
            url: url.into(),
            source: Source::Article,
            score,
            published_at: None,
        }
    }

    #[test]
    fn normalize_text_decodes_and_collapses() {
        let s = "  <b>Hello</b>&nbsp;&amp;\n\n world  ";
        assert_eq!(normalize_text(s), "Hello & world");
    }

    #[test]
    fn normalize_text_caps_length() {
        let long = "x".repeat(MAX_TEXT_CHARS + 50);
        assert_eq!(normalize_text(&long).chars().count(), MAX_TEXT_CHARS);
    }

    #[test]
    fn near_duplicate_is_symmetric_and_case_insensitive() {
        let a = "Building a Design System in React";
        let b = "building a design system in react (part 2)";
        assert!(is_near_duplicate_title(a, b));
        assert!(is_near_duplicate_title(b, a));
        assert!(!is_near_duplicate_title(a, "Vue 3 Composition API tips"));
    }

    #[test]
    fn near_duplicate_uses_floor_of_eighty_percent() {
        // "abcde": prefix of 4 chars "abcd"
        assert!(is_near_duplicate_title("abcde", "xxabcdyy"));
        assert!(!is_near_duplicate_title("abcde", "xxabcyy"));
    }

    #[test]
    fn equal_length_titles_match_in_both_orders() {
        assert!(is_near_duplicate_title("abcdz", "zabcd"));
        assert!(is_near_duplicate_title("zabcd", "abcdz"));
        assert!(!is_near_duplicate_title("abcdz", "vwxyz"));
    }

    #[test]
    fn package_names_only_collapse_when_identical() {
        let pool = vec![
            item("vue", "https://www.npmjs.com/package/vue", 0.9),
            item("ui", "https://www.npmjs.com/package/ui", 0.8),
            item("vuex", "https://www.npmjs.com/package/vuex", 0.7),
            item("vue", "https://mirror/vue", 0.6),
        ];
        let (kept, dropped) = dedup_candidates_by(pool.clone(), TitleMatch::Exact);
        let names: Vec<_> = kept.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(names, vec!["vue", "ui", "vuex"]);
        assert_eq!(dropped, 1);

        let (near, _) = dedup_candidates_by(pool, TitleMatch::Near);
        assert!(near.len() < 3);
        assert_eq!(TitleMatch::for_source(Source::PackageTrend), TitleMatch::Exact);
        assert_eq!(TitleMatch::for_source(Source::Article), TitleMatch::Near);
    }

    #[test]
    fn one_char_titles_only_match_exactly() {
        assert!(!is_near_duplicate_title("a", "totally different"));
        assert!(is_near_duplicate_title("A", "a"));
    }

    #[test]
    fn dedup_keeps_first_by_url() {
        let (kept, dropped) = dedup_candidates(vec![
            item("First title here", "https://x/1", 0.1),
            item("Other words entirely", "https://x/1", 0.9),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "First title here");
        assert_eq!(dropped, 1);
    }

    #[test]
    fn relevance_checks_title_and_description() {
        let kw: Vec<String> = vec!["react".into(), "css".into()];
        assert!(is_relevant("My REACT hooks", None, &kw));
        assert!(is_relevant("tooling", Some("Tailwind CSS plugin"), &kw));
        assert!(!is_relevant("rust db", Some("storage engine"), &kw));
    }

    #[test]
    fn rank_prefers_score_then_newer_date() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut a = item("a-item title", "https://x/a", 0.5);
        a.published_at = Some(t0);
        let mut b = item("b-item title", "https://x/b", 0.5);
        b.published_at = Some(t0 + Duration::days(1));
        let c = item("c-item title", "https://x/c", 0.9);
        let out = rank_and_truncate(vec![a, b, c], 2);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].url, "https://x/c");
        assert_eq!(out[1].url, "https://x/b");
    }

    #[test]
    fn age_filter_spares_undated_items() {
        let now = Utc.with_ymd_and_hms(2025, 1, 20, 0, 0, 0).unwrap();
        let mut old = item("old post title", "https://x/old", 0.5);
        old.published_at = Some(now - Duration::days(10));
        let undated = item("undated post", "https://x/u", 0.5);
        let out = drop_older_than(vec![old, undated], now, Some(7));
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].url, "https://x/u");
    }

    #[test]
    fn per_query_size_oversupplies() {
        assert_eq!(per_query_size(15, 10, 1), 5);
        assert_eq!(per_query_size(10, 2, 1), 15);
        assert_eq!(per_query_size(1, 10, 3), 3);
    }
}
