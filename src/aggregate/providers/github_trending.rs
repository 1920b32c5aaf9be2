// src/aggregate/providers/github_trending.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::aggregate::types::{CandidateItem, SourceKind, SourceProvider};

const GITHUB_API: &str = "https://api.github.com";

#[derive(Debug, Deserialize)]
struct SearchResp {
    #[serde(default)]
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    full_name: String,
    description: Option<String>,
    stargazers_count: i64,
    html_url: String,
    created_at: Option<String>,
}

enum Input {
    Http {
        http: reqwest::Client,
        token: Option<String>,
    },
    /// A single search response body, as returned by `/search/repositories`.
    Fixture(String),
}

/// Trending repositories via the GitHub search API: a handful of
/// freshness-biased queries, merged and de-duplicated by full name.
pub struct GithubTrendingProvider {
    input: Input,
    recency_days: i64,
    max_items: usize,
}

impl GithubTrendingProvider {
    pub fn new(token: Option<String>, recency_days: i64, max_items: usize) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("daily-digest-curator/0.1 (content aggregator)")
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            input: Input::Http { http, token },
            recency_days,
            max_items,
        }
    }

    pub fn from_fixture(search_json: &str, recency_days: i64, max_items: usize) -> Self {
        Self {
            input: Input::Fixture(search_json.to_string()),
            recency_days,
            max_items,
        }
    }

    fn queries(&self, since: &str) -> Vec<String> {
        vec![
            format!("created:>{since} stars:>20"),
            format!("pushed:>{since} stars:>50"),
            format!("topic:ai created:>{since} stars:>15"),
        ]
    }

    fn to_candidates(&self, repos: Vec<Repo>) -> Vec<CandidateItem> {
        // Dedup across queries by full name, keep the starriest first.
        let mut by_name: BTreeMap<String, Repo> = BTreeMap::new();
        for repo in repos {
            by_name.entry(repo.full_name.clone()).or_insert(repo);
        }
        let mut repos: Vec<Repo> = by_name.into_values().collect();
        repos.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));

        repos
            .into_iter()
            .map(|repo| CandidateItem {
                title: repo.full_name,
                url: repo.html_url,
                source: SourceKind::GithubTrending,
                published_at: repo
                    .created_at
                    .as_deref()
                    .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
                    .map(|dt| dt.with_timezone(&Utc)),
                summary: repo.description,
            })
            .collect()
    }
}

#[async_trait]
impl SourceProvider for GithubTrendingProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        let repos = match &self.input {
            Input::Fixture(json) => {
                let resp: SearchResp =
                    serde_json::from_str(json).context("parsing github search fixture")?;
                resp.items
            }
            Input::Http { http, token } => {
                let since = (Utc::now() - chrono::Duration::days(self.recency_days))
                    .format("%Y-%m-%d")
                    .to_string();
                let mut repos = Vec::new();
                for query in self.queries(&since) {
                    let mut req = http
                        .get(format!("{GITHUB_API}/search/repositories"))
                        .query(&[
                            ("q", query.as_str()),
                            ("sort", "stars"),
                            ("order", "desc"),
                            ("per_page", "10"),
                        ]);
                    if let Some(token) = token {
                        req = req.bearer_auth(token);
                    }
                    match req.send().await.and_then(|r| r.error_for_status()) {
                        Ok(resp) => {
                            let parsed: SearchResp =
                                resp.json().await.context("parsing github search response")?;
                            repos.extend(parsed.items);
                        }
                        Err(e) => {
                            // One bad query should not sink the others.
                            tracing::warn!(query = %query, error = ?e, "github search query failed");
                        }
                    }
                    // Rate limiting courtesy
                    tokio::time::sleep(std::time::Duration::from_millis(300)).await;
                }
                repos
            }
        };

        let out = self.to_candidates(repos);
        counter!("digest_source_items_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &str {
        "GitHub Trending"
    }

    fn recency_days(&self) -> i64 {
        self.recency_days
    }

    fn max_items(&self) -> usize {
        self.max_items
    }
}
