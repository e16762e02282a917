// tests/providers_devto.rs
use chrono::{Duration, Utc};
use frontend_trend_sync::ingest::providers::devto::DevToFetcher;
use frontend_trend_sync::TrendFetcher;
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn articles_are_deduped_aged_and_ranked() {
    let now = Utc::now();
    let server = MockServer::start().await;

    let react = json!([
        {
            "title": "Vite 5.0 Released",
            "description": "What is new in Vite 5",
            "url": "https://dev.to/a/vite-5",
            "published_at": (now - Duration::days(2)).to_rfc3339(),
            "public_reactions_count": 60
        },
        {
            "title": "Ancient jQuery tips",
            "url": "https://dev.to/a/jquery",
            "published_at": (now - Duration::days(40)).to_rfc3339(),
            "public_reactions_count": 500
        },
        {
            "title": "Quiet little CSS post",
            "path": "/b/quiet-css",
            "published_at": (now - Duration::days(6)).to_rfc3339(),
            "public_reactions_count": 1
        }
    ]);
    let vue = json!([
        {
            "title": "Vite 5.0 Released!!",
            "url": "https://dev.to/c/vite-5-copy",
            "published_at": (now - Duration::days(1)).to_rfc3339(),
            "public_reactions_count": 10
        },
        {
            "title": "Another",
            "url": "https://dev.to/a/vite-5",
            "published_at": (now - Duration::days(1)).to_rfc3339(),
            "public_reactions_count": 10
        }
    ]);

    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("tag", "react"))
        .and(query_param("state", "rising"))
        .and(query_param("top", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(react))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("tag", "vue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vue))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .and(query_param("tag", "svelte"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = DevToFetcher::new(
        server.uri(),
        vec!["react".into(), "svelte".into(), "vue".into()],
    );
    let items = fetcher.fetch(10, Some(7)).await.unwrap();

    let urls: Vec<_> = items.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://dev.to/a/vite-5", "https://dev.to/b/quiet-css"]
    );
    assert!((items[0].score - 0.829).abs() < 0.01, "score {}", items[0].score);
    assert_eq!(items[1].description.as_deref(), Some("Trending react article"));
}

#[tokio::test]
async fn limit_truncates_after_ranking() {
    let now = Utc::now();
    let server = MockServer::start().await;
    let body = json!([
        { "title": "Low reactions today", "url": "https://dev.to/x/1",
          "published_at": now.to_rfc3339(), "public_reactions_count": 0 },
        { "title": "High reactions today", "url": "https://dev.to/x/2",
          "published_at": now.to_rfc3339(), "public_reactions_count": 80 }
    ]);
    Mock::given(method("GET"))
        .and(path("/api/articles"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let fetcher = DevToFetcher::new(server.uri(), vec!["css".into()]);
    let items = fetcher.fetch(1, Some(14)).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url, "https://dev.to/x/2");
}
