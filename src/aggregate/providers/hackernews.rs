// src/aggregate/providers/hackernews.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;

use crate::aggregate::types::{CandidateItem, SourceKind, SourceProvider};

const HN_BASE: &str = "https://hacker-news.firebaseio.com/v0";

#[derive(Debug, Deserialize)]
struct Story {
    id: Option<u64>,
    title: Option<String>,
    url: Option<String>,
    score: Option<i64>,
    time: Option<i64>,
    #[serde(rename = "type")]
    kind: Option<String>,
}

enum Input {
    Http { http: reqwest::Client },
    /// JSON array of story objects, as returned by `item/{id}.json`.
    Fixture(String),
}

/// Hacker News top stories via the Firebase API. Two-stage fetch: the id
/// list first, then one request per story, with a small courtesy delay.
pub struct HackerNewsProvider {
    input: Input,
    recency_days: i64,
    max_items: usize,
    min_score: i64,
}

impl HackerNewsProvider {
    pub fn new(recency_days: i64, max_items: usize, min_score: i64) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("daily-digest-curator/0.1 (content aggregator)")
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            input: Input::Http { http },
            recency_days,
            max_items,
            min_score,
        }
    }

    pub fn from_fixture(stories_json: &str, recency_days: i64, max_items: usize, min_score: i64) -> Self {
        Self {
            input: Input::Fixture(stories_json.to_string()),
            recency_days,
            max_items,
            min_score,
        }
    }

    fn to_candidate(&self, story: Story) -> Option<CandidateItem> {
        if story.kind.as_deref() != Some("story") {
            return None;
        }
        if story.score.unwrap_or(0) <= self.min_score {
            return None;
        }
        let title = story.title?;
        // Link-less stories (Ask HN etc.) point at the discussion page.
        let url = match (story.url, story.id) {
            (Some(u), _) if !u.trim().is_empty() => u,
            (_, Some(id)) => format!("https://news.ycombinator.com/item?id={id}"),
            _ => return None,
        };
        Some(CandidateItem {
            title,
            url,
            source: SourceKind::HackerNews,
            published_at: story
                .time
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            summary: None,
        })
    }
}

#[async_trait]
impl SourceProvider for HackerNewsProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        let stories: Vec<Story> = match &self.input {
            Input::Fixture(json) => {
                serde_json::from_str(json).context("parsing hackernews fixture")?
            }
            Input::Http { http } => {
                let ids: Vec<u64> = http
                    .get(format!("{HN_BASE}/topstories.json"))
                    .send()
                    .await
                    .context("fetching hackernews top stories")?
                    .error_for_status()
                    .context("hackernews top stories status")?
                    .json()
                    .await
                    .context("parsing hackernews id list")?;

                // Fetch extra ids; the score filter thins them out below.
                let mut stories = Vec::new();
                for id in ids.into_iter().take(self.max_items * 2) {
                    match http
                        .get(format!("{HN_BASE}/item/{id}.json"))
                        .send()
                        .await
                        .and_then(|r| r.error_for_status())
                    {
                        Ok(resp) => {
                            if let Ok(story) = resp.json::<Story>().await {
                                stories.push(story);
                            }
                        }
                        Err(e) => {
                            tracing::debug!(id, error = ?e, "skipping hackernews item");
                        }
                    }
                    // Rate limiting courtesy
                    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
                    if stories.len() >= self.max_items * 2 {
                        break;
                    }
                }
                stories
            }
        };

        let out: Vec<CandidateItem> = stories
            .into_iter()
            .filter_map(|s| self.to_candidate(s))
            .collect();
        counter!("digest_source_items_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &str {
        "Hacker News"
    }

    fn recency_days(&self) -> i64 {
        self.recency_days
    }

    fn max_items(&self) -> usize {
        self.max_items
    }
}
