// src/curate/anthropic.rs
//! Anthropic-backed curator. One messages-API call per run; the model is
//! asked for strict JSON and anything unparseable is a run failure (spec:
//! better no email than a garbage email).

use std::collections::HashSet;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::aggregate::types::CandidateItem;
use crate::config::UserProfile;

use super::{render_candidate_block, Curator, DigestContent, DigestItem};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

const SYSTEM_PROMPT: &str = "You are a careful tech digest curator. Pick the most relevant, \
diverse items for this reader and write one short factual blurb (40-80 words) per item. \
Only use facts present in the candidate data. Never invent URLs, names, numbers, or \
attributions. Respond with valid JSON only, no markdown fences, shaped as \
{\"subject\": str, \"intro\": str, \"items\": [{\"title\": str, \"url\": str, \"blurb\": str}]}.";

pub struct AnthropicCurator {
    http: reqwest::Client,
    api_key: String,
    model: String,
    max_items: usize,
}

impl AnthropicCurator {
    pub fn new(api_key: String, model: &str, max_items: usize) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("daily-digest-curator/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(60))
            .build()
            .expect("reqwest client");
        Self {
            http,
            api_key,
            model: model.to_string(),
            max_items,
        }
    }

    fn build_prompt(&self, profile: &UserProfile, candidates: &[CandidateItem]) -> String {
        let interests = if profile.interests.is_empty() {
            "general software engineering".to_string()
        } else {
            profile.interests.join(", ")
        };
        let location = profile
            .location
            .as_deref()
            .map(|l| format!("\nReader location: {l}"))
            .unwrap_or_default();
        format!(
            "Reader: {name}\nInterests: {interests}{location}\nDate: {date}\n\n\
             Candidate items (every url below is real; use them verbatim):\n\n{block}\n\
             Select up to {max} items. Prefer variety across sources. JSON only.",
            name = profile.name,
            date = Utc::now().format("%Y-%m-%d"),
            block = render_candidate_block(candidates),
            max = self.max_items,
        )
    }

    /// Map the model's JSON back onto the candidate pool. Items pointing at
    /// URLs we never offered are dropped: a link we cannot vouch for is a
    /// fabrication, whatever the prose around it says.
    fn resolve_items(
        &self,
        parsed: Vec<LlmItem>,
        candidates: &[CandidateItem],
    ) -> Vec<DigestItem> {
        let known: HashSet<&str> = candidates.iter().map(|c| c.url.as_str()).collect();
        let mut out = Vec::new();
        for item in parsed {
            if !known.contains(item.url.as_str()) {
                warn!(url = %item.url, "curator invented a url; dropping item");
                continue;
            }
            let source_label = candidates
                .iter()
                .find(|c| c.url == item.url)
                .map(|c| c.source.label().to_string())
                .unwrap_or_default();
            out.push(DigestItem {
                title: item.title,
                url: item.url,
                source_label,
                blurb: item.blurb,
            });
            if out.len() == self.max_items {
                break;
            }
        }
        out
    }
}

#[derive(Debug, Deserialize)]
struct LlmDigest {
    subject: Option<String>,
    intro: Option<String>,
    #[serde(default)]
    items: Vec<LlmItem>,
}

#[derive(Debug, Deserialize)]
struct LlmItem {
    title: String,
    url: String,
    blurb: String,
}

/// Strip ```json fences some models wrap around otherwise-valid output.
fn strip_fences(raw: &str) -> &str {
    let t = raw.trim();
    let t = t
        .strip_prefix("```json")
        .or_else(|| t.strip_prefix("```"))
        .unwrap_or(t);
    t.strip_suffix("```").unwrap_or(t).trim()
}

#[async_trait]
impl Curator for AnthropicCurator {
    async fn curate(
        &self,
        profile: &UserProfile,
        candidates: &[CandidateItem],
    ) -> Result<DigestContent> {
        #[derive(Serialize)]
        struct Msg<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            max_tokens: u32,
            temperature: f32,
            system: &'a str,
            messages: Vec<Msg<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            content: Vec<Block>,
        }
        #[derive(Deserialize)]
        struct Block {
            #[serde(default)]
            text: String,
        }

        let prompt = self.build_prompt(profile, candidates);
        let req = Req {
            model: &self.model,
            max_tokens: 4000,
            temperature: 0.7,
            system: SYSTEM_PROMPT,
            messages: vec![Msg {
                role: "user",
                content: &prompt,
            }],
        };

        let resp = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&req)
            .send()
            .await
            .context("calling anthropic messages api")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("anthropic api returned {status}: {}", body.chars().take(300).collect::<String>());
        }

        let body: Resp = resp.json().await.context("reading anthropic response")?;
        let text = body
            .content
            .first()
            .map(|b| b.text.as_str())
            .unwrap_or_default();
        debug!(chars = text.len(), "anthropic response received");

        let parsed: LlmDigest = serde_json::from_str(strip_fences(text))
            .context("anthropic response was not the requested JSON shape")?;

        let items = self.resolve_items(parsed.items, candidates);
        if items.is_empty() {
            bail!("anthropic curation produced no usable items");
        }

        let date = Utc::now().format("%B %d, %Y");
        Ok(DigestContent {
            subject: parsed
                .subject
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| format!("Your daily digest: {date}")),
            intro: parsed.intro.unwrap_or_default(),
            items,
        })
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
