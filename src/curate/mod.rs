// src/curate/mod.rs
//! Curation: turn a filtered candidate pool into the written digest.
//!
//! Two implementations behind one trait: the Anthropic-backed curator used
//! in production, and a deterministic heuristic curator used when no API
//! key is configured and in tests. Both receive a pool that has already
//! passed the dedup filter and both are bounded by `max_items`.

pub mod anthropic;
pub mod heuristic;

use std::sync::Arc;

use anyhow::Result;
use tracing::warn;

use crate::aggregate::types::CandidateItem;
use crate::config::{Settings, UserProfile};

pub use anthropic::AnthropicCurator;
pub use heuristic::HeuristicCurator;

/// One written-up digest entry. `url` always comes from the candidate pool;
/// curators must not invent links.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct DigestItem {
    pub title: String,
    pub url: String,
    pub source_label: String,
    pub blurb: String,
}

/// The finished digest, ready for rendering and delivery.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct DigestContent {
    pub subject: String,
    pub intro: String,
    pub items: Vec<DigestItem>,
}

#[async_trait::async_trait]
pub trait Curator: Send + Sync {
    /// Select and write up to the configured number of items. Fewer than the
    /// maximum is legitimate; padding with weak content is not.
    async fn curate(
        &self,
        profile: &UserProfile,
        candidates: &[CandidateItem],
    ) -> Result<DigestContent>;

    fn name(&self) -> &'static str;
}

/// Factory: Anthropic when a key is configured, heuristic otherwise.
pub fn build_curator(settings: &Settings) -> Arc<dyn Curator> {
    match &settings.anthropic_api_key {
        Some(key) => Arc::new(AnthropicCurator::new(
            key.clone(),
            &settings.anthropic_model,
            settings.max_items,
        )),
        None => {
            warn!("no ANTHROPIC_API_KEY configured; using heuristic curator");
            Arc::new(HeuristicCurator::new(settings.max_items))
        }
    }
}

/// Numbered candidate listing shared by prompt building and logging.
pub fn render_candidate_block(candidates: &[CandidateItem]) -> String {
    let mut out = String::new();
    for (i, c) in candidates.iter().enumerate() {
        out.push_str(&format!("{}. [{}] {}\n   url: {}\n", i + 1, c.source, c.title, c.url));
        if let Some(summary) = &c.summary {
            out.push_str(&format!("   summary: {summary}\n"));
        }
        if let Some(ts) = c.published_at {
            out.push_str(&format!("   published: {}\n", ts.to_rfc3339()));
        }
    }
    out
}
