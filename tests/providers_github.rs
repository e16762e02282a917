// tests/providers_github.rs
use frontend_trend_sync::config::SourcesConfig;
use frontend_trend_sync::ingest::providers::github_trending::GithubTrendingFetcher;
use frontend_trend_sync::{Source, TrendFetcher};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn trending_page_is_filtered_and_ranked_by_stars() {
    let server = MockServer::start().await;
    let html = std::fs::read_to_string("tests/fixtures/github_trending.html")
        .expect("missing tests/fixtures/github_trending.html");

    Mock::given(method("GET"))
        .and(path("/trending/javascript"))
        .and(query_param("since", "daily"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/trending/typescript"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let cfg = SourcesConfig {
        github_base_url: server.uri(),
        ..SourcesConfig::default()
    };
    let fetcher = GithubTrendingFetcher::from_config(&cfg);
    assert_eq!(fetcher.source(), Source::RepoTrend);

    let items = fetcher.fetch(10, None).await.expect("sub-query errors never bubble up");
    let urls: Vec<_> = items.iter().map(|c| c.url.as_str()).collect();
    assert_eq!(
        urls,
        vec!["https://github.com/shadcn-ui/ui", "https://github.com/vuejs/core"]
    );
    assert_eq!(items[0].title, "shadcn-ui / ui");
    assert!(items[0].score > items[1].score);
    assert!(items.iter().all(|c| c.published_at.is_none()));
}

#[tokio::test]
async fn all_languages_failing_yields_empty() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fetcher = GithubTrendingFetcher::new(
        server.uri(),
        vec!["javascript".into(), "typescript".into()],
        "weekly",
        vec!["react".into()],
    );
    let items = fetcher.fetch(5, None).await.unwrap();
    assert!(items.is_empty());
}
