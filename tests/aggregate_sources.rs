// tests/aggregate_sources.rs
// Partial-failure isolation and recency behavior of the source fan-out.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use daily_digest_curator::aggregate::types::{CandidateItem, SourceKind, SourceProvider};
use daily_digest_curator::aggregate::{collect_candidates, MissingDatePolicy};

struct FixedProvider {
    name: &'static str,
    items: Vec<CandidateItem>,
    recency_days: i64,
}

#[async_trait]
impl SourceProvider for FixedProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        self.name
    }
    fn recency_days(&self) -> i64 {
        self.recency_days
    }
    fn max_items(&self) -> usize {
        10
    }
}

struct FailingProvider;

#[async_trait]
impl SourceProvider for FailingProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        anyhow::bail!("connection refused")
    }
    fn name(&self) -> &str {
        "broken"
    }
    fn recency_days(&self) -> i64 {
        5
    }
    fn max_items(&self) -> usize {
        10
    }
}

struct HangingProvider;

#[async_trait]
impl SourceProvider for HangingProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }
    fn name(&self) -> &str {
        "tarpit"
    }
    fn recency_days(&self) -> i64 {
        5
    }
    fn max_items(&self) -> usize {
        10
    }
}

fn item(title: &str, url: &str, age_hours: i64) -> CandidateItem {
    CandidateItem {
        title: title.to_string(),
        url: url.to_string(),
        source: SourceKind::NewsSite("Test".into()),
        published_at: Some(Utc::now() - chrono::Duration::hours(age_hours)),
        summary: None,
    }
}

#[tokio::test]
async fn one_dead_source_never_sinks_the_pool() {
    let providers: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(FixedProvider {
            name: "healthy",
            items: vec![
                item("a", "https://example.com/a", 0),
                item("b", "https://example.com/b", 1),
            ],
            recency_days: 5,
        }),
        Arc::new(FailingProvider),
    ];

    let pool =
        collect_candidates(&providers, MissingDatePolicy::Include, Duration::from_secs(5)).await;
    assert_eq!(pool.len(), 2);
}

#[tokio::test]
async fn a_hanging_source_is_cut_off_at_the_timeout() {
    let providers: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(HangingProvider),
        Arc::new(FixedProvider {
            name: "healthy",
            items: vec![item("a", "https://example.com/a", 0)],
            recency_days: 5,
        }),
    ];

    let started = std::time::Instant::now();
    let pool =
        collect_candidates(&providers, MissingDatePolicy::Include, Duration::from_secs(1)).await;
    assert_eq!(pool.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test]
async fn stale_items_never_reach_the_pool() {
    // Window is 5 days: an hour inside the edge is kept, an hour past is out.
    // (The exact-edge boundary is pinned in the sanitize_batch unit tests,
    // where `now` is held fixed.)
    let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(FixedProvider {
        name: "mixed",
        items: vec![
            item("fresh", "https://example.com/fresh", 0),
            item("edge", "https://example.com/edge", 5 * 24 - 1),
            item("stale", "https://example.com/stale", 5 * 24 + 1),
        ],
        recency_days: 5,
    })];

    let pool =
        collect_candidates(&providers, MissingDatePolicy::Include, Duration::from_secs(5)).await;
    let urls: Vec<&str> = pool.iter().map(|i| i.url.as_str()).collect();
    assert!(urls.contains(&"https://example.com/fresh"));
    assert!(urls.contains(&"https://example.com/edge"));
    assert!(!urls.contains(&"https://example.com/stale"));
}

#[tokio::test]
async fn all_sources_failing_yields_an_empty_pool_not_an_error() {
    let providers: Vec<Arc<dyn SourceProvider>> =
        vec![Arc::new(FailingProvider), Arc::new(FailingProvider)];
    let pool =
        collect_candidates(&providers, MissingDatePolicy::Include, Duration::from_secs(5)).await;
    assert!(pool.is_empty());
}
