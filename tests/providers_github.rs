use daily_digest_curator::aggregate::providers::github_trending::GithubTrendingProvider;
use daily_digest_curator::aggregate::types::{SourceKind, SourceProvider};

const SEARCH_JSON: &str = include_str!("fixtures/github_search.json");

#[tokio::test]
async fn repos_dedup_by_full_name() {
    let provider = GithubTrendingProvider::from_fixture(SEARCH_JSON, 3, 10);
    let items = provider.fetch_latest().await.expect("github parse ok");

    // The fixture repeats example/fastgrep once.
    assert_eq!(items.len(), 3);
    let names: Vec<&str> = items.iter().map(|i| i.title.as_str()).collect();
    assert_eq!(
        names.iter().filter(|n| **n == "example/fastgrep").count(),
        1
    );
}

#[tokio::test]
async fn starriest_repo_comes_first() {
    let provider = GithubTrendingProvider::from_fixture(SEARCH_JSON, 3, 10);
    let items = provider.fetch_latest().await.unwrap();

    assert_eq!(items[0].title, "example/fastgrep");
    assert_eq!(items[0].source, SourceKind::GithubTrending);
    assert!(items[0].published_at.is_some());
}

#[tokio::test]
async fn missing_descriptions_are_allowed() {
    let provider = GithubTrendingProvider::from_fixture(SEARCH_JSON, 3, 10);
    let items = provider.fetch_latest().await.unwrap();

    let bare = items.iter().find(|i| i.title == "example/nodesc").unwrap();
    assert!(bare.summary.is_none());
}
