use daily_digest_curator::aggregate::providers::hackernews::HackerNewsProvider;
use daily_digest_curator::aggregate::types::{SourceKind, SourceProvider};

const HN_JSON: &str = include_str!("fixtures/hn_stories.json");

#[tokio::test]
async fn only_scoring_stories_survive() {
    let provider = HackerNewsProvider::from_fixture(HN_JSON, 2, 15, 30);
    let items = provider.fetch_latest().await.expect("hn parse ok");

    // Five fixture entries: one below min score, one is a comment.
    assert_eq!(items.len(), 3);
    assert!(items.iter().all(|i| i.source == SourceKind::HackerNews));
    assert!(!items.iter().any(|i| i.title.contains("Low-score")));
    assert!(!items.iter().any(|i| i.title.contains("comment")));
}

#[tokio::test]
async fn linkless_stories_point_at_the_discussion() {
    let provider = HackerNewsProvider::from_fixture(HN_JSON, 2, 15, 30);
    let items = provider.fetch_latest().await.unwrap();

    let ask = items
        .iter()
        .find(|i| i.title.starts_with("Ask HN"))
        .expect("ask hn present");
    assert_eq!(ask.url, "https://news.ycombinator.com/item?id=41203002");
}

#[tokio::test]
async fn unix_times_become_timestamps() {
    let provider = HackerNewsProvider::from_fixture(HN_JSON, 2, 15, 30);
    let items = provider.fetch_latest().await.unwrap();
    assert!(items.iter().all(|i| i.published_at.is_some()));
}

#[tokio::test]
async fn min_score_is_configurable() {
    let provider = HackerNewsProvider::from_fixture(HN_JSON, 2, 15, 10);
    let items = provider.fetch_latest().await.unwrap();
    assert!(items.iter().any(|i| i.title.contains("Low-score")));
}
