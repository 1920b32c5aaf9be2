// src/aggregate/providers/devpost.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use once_cell::sync::OnceCell;
use regex::Regex;
use serde::Deserialize;

use crate::aggregate::types::{CandidateItem, SourceKind, SourceProvider};

const DEVPOST_API: &str = "https://devpost.com/api/hackathons";

#[derive(Debug, Deserialize)]
struct HackathonList {
    #[serde(default)]
    hackathons: Vec<Hackathon>,
}

#[derive(Debug, Deserialize)]
struct Hackathon {
    title: Option<String>,
    url: Option<String>,
    open_state: Option<String>,
    organization_name: Option<String>,
    prize_amount: Option<String>,
    registrations_count: Option<u64>,
    #[serde(default)]
    themes: Vec<Theme>,
    submission_period_dates: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Theme {
    name: Option<String>,
}

/// Pull the dollar figure out of Devpost's HTML-wrapped prize string.
fn parse_prize(raw: &str) -> Option<String> {
    static RE: OnceCell<Regex> = OnceCell::new();
    let re = RE.get_or_init(|| Regex::new(r"(\d+(?:,\d+)*)").unwrap());
    re.captures(raw).map(|c| format!("${}", &c[1]))
}

enum Input {
    Http { http: reqwest::Client },
    Fixture(String),
}

/// Open hackathons from the Devpost JSON API. Listings are undated; the
/// aggregator's missing-date policy decides whether they pass through.
pub struct DevpostProvider {
    input: Input,
    max_items: usize,
}

impl DevpostProvider {
    pub fn new(max_items: usize) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("daily-digest-curator/0.1 (content aggregator)")
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("reqwest client");
        Self {
            input: Input::Http { http },
            max_items,
        }
    }

    pub fn from_fixture(json: &str, max_items: usize) -> Self {
        Self {
            input: Input::Fixture(json.to_string()),
            max_items,
        }
    }

    fn to_candidate(h: Hackathon) -> Option<CandidateItem> {
        if h.open_state.as_deref() != Some("open") {
            return None;
        }
        let title = h.title?;
        let url = h.url.filter(|u| !u.trim().is_empty())?;

        let organizer = h.organization_name.unwrap_or_else(|| "Unknown".to_string());
        let prize = h
            .prize_amount
            .as_deref()
            .and_then(parse_prize)
            .unwrap_or_else(|| "prizes available".to_string());
        let themes: Vec<String> = h
            .themes
            .into_iter()
            .filter_map(|t| t.name)
            .take(3)
            .collect();

        let mut summary = format!("{organizer} hackathon with {prize} in prizes.");
        if let Some(n) = h.registrations_count {
            summary.push_str(&format!(" {n} participants registered."));
        }
        if !themes.is_empty() {
            summary.push_str(&format!(" Themes: {}.", themes.join(", ")));
        }
        if let Some(dates) = h.submission_period_dates {
            summary.push_str(&format!(" Submissions: {dates}."));
        }

        Some(CandidateItem {
            title,
            url,
            source: SourceKind::Opportunity,
            published_at: None,
            summary: Some(summary),
        })
    }
}

#[async_trait]
impl SourceProvider for DevpostProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        let body = match &self.input {
            Input::Fixture(json) => json.clone(),
            Input::Http { http } => http
                .get(DEVPOST_API)
                .send()
                .await
                .context("fetching devpost hackathons")?
                .error_for_status()
                .context("devpost status")?
                .text()
                .await
                .context("reading devpost body")?,
        };

        let list: HackathonList = serde_json::from_str(&body).context("parsing devpost json")?;
        let out: Vec<CandidateItem> = list
            .hackathons
            .into_iter()
            .filter_map(Self::to_candidate)
            .collect();
        counter!("digest_source_items_total").increment(out.len() as u64);
        Ok(out)
    }

    fn name(&self) -> &str {
        "Devpost"
    }

    fn recency_days(&self) -> i64 {
        // Listings carry no publish date; the bound is nominal.
        30
    }

    fn max_items(&self) -> usize {
        self.max_items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prize_parsing_handles_html_wrapping() {
        assert_eq!(
            parse_prize("<span data-currency=\"USD\">50,000</span>").as_deref(),
            Some("$50,000")
        );
        assert_eq!(parse_prize("no digits here"), None);
    }
}
