// src/aggregate/providers/news_rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;
use time::{format_description::well_known::Rfc2822, OffsetDateTime, UtcOffset};

use crate::aggregate::normalize_text;
use crate::aggregate::types::{CandidateItem, SourceKind, SourceProvider};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
    description: Option<String>,
}

fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
}

enum Input {
    Http { http: reqwest::Client, url: String },
    Fixture(String),
}

/// Generic RSS 2.0 news provider. One instance per configured feed; the feed
/// name becomes the item's `NewsSite` label.
pub struct NewsRssProvider {
    name: String,
    input: Input,
    recency_days: i64,
    max_items: usize,
}

impl NewsRssProvider {
    pub fn new(name: &str, feed_url: &str, recency_days: i64, max_items: usize) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("daily-digest-curator/0.1 (content aggregator)")
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            name: name.to_string(),
            input: Input::Http {
                http,
                url: feed_url.to_string(),
            },
            recency_days,
            max_items,
        }
    }

    /// Parse canned XML instead of fetching; used by tests.
    pub fn from_fixture(name: &str, content: &str, recency_days: i64, max_items: usize) -> Self {
        Self {
            name: name.to_string(),
            input: Input::Fixture(content.to_string()),
            recency_days,
            max_items,
        }
    }

    fn parse_feed(&self, xml: &str) -> Result<Vec<CandidateItem>> {
        let t0 = std::time::Instant::now();

        let rss: Rss = from_str(xml).with_context(|| format!("parsing {} rss xml", self.name))?;
        let mut out = Vec::with_capacity(rss.channel.item.len());

        for it in rss.channel.item {
            let title = normalize_text(it.title.as_deref().unwrap_or_default());
            let url = match it.link {
                Some(l) if !l.trim().is_empty() => l.trim().to_string(),
                _ => continue,
            };
            if title.is_empty() {
                continue;
            }
            out.push(CandidateItem {
                title,
                url,
                source: SourceKind::NewsSite(self.name.clone()),
                published_at: it.pub_date.as_deref().and_then(parse_rfc2822),
                summary: it
                    .description
                    .as_deref()
                    .map(normalize_text)
                    .filter(|s| !s.is_empty()),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("digest_source_parse_ms").record(ms);
        counter!("digest_source_items_total").increment(out.len() as u64);

        Ok(out)
    }
}

#[async_trait]
impl SourceProvider for NewsRssProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        let xml = match &self.input {
            Input::Fixture(content) => content.clone(),
            Input::Http { http, url } => {
                let resp = http
                    .get(url)
                    .send()
                    .await
                    .with_context(|| format!("fetching feed {url}"))?;
                if !resp.status().is_success() {
                    anyhow::bail!("feed {} returned HTTP {}", self.name, resp.status());
                }
                resp.text().await.context("reading feed body")?
            }
        };
        self.parse_feed(&xml)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn recency_days(&self) -> i64 {
        self.recency_days
    }

    fn max_items(&self) -> usize {
        self.max_items
    }
}
