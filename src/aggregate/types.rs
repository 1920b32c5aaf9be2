// src/aggregate/types.rs
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Where a candidate came from. News feeds carry their configured site name.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    GithubTrending,
    HackerNews,
    NewsSite(String),
    Opportunity,
}

impl SourceKind {
    /// Human-readable label used in rendered digests and logs.
    pub fn label(&self) -> &str {
        match self {
            SourceKind::GithubTrending => "GitHub Trending",
            SourceKind::HackerNews => "Hacker News",
            SourceKind::NewsSite(name) => name.as_str(),
            SourceKind::Opportunity => "Devpost",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// One normalized item produced by a source provider.
///
/// `url` is guaranteed non-empty and parseable once the item has passed
/// through [`super::sanitize_batch`]; raw provider output makes no such
/// promise.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct CandidateItem {
    pub title: String,
    pub url: String,
    pub source: SourceKind,
    pub published_at: Option<DateTime<Utc>>,
    pub summary: Option<String>,
}

#[async_trait::async_trait]
pub trait SourceProvider: Send + Sync {
    /// Fetch the most recent items this source has to offer. Errors are
    /// per-source conditions; the aggregator logs them and moves on.
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>>;

    fn name(&self) -> &str;

    /// Maximum age, in days, an item may have to still count as fresh.
    fn recency_days(&self) -> i64;

    /// Upper bound on items this source contributes per run.
    fn max_items(&self) -> usize;
}
