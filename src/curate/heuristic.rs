// src/curate/heuristic.rs
//! Deterministic fallback curator: interest-keyword scoring plus
//! near-duplicate decay, no network. Also the curator the test suite runs
//! against.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use strsim::normalized_levenshtein;

use crate::aggregate::types::CandidateItem;
use crate::config::UserProfile;

use super::{Curator, DigestContent, DigestItem};

/// Titles at least this similar are treated as the same story told twice.
const SIMILARITY_THRESHOLD: f64 = 0.90;
/// Weight multiplier applied to the later near-duplicates.
const DUPLICATE_DECAY: f64 = 0.3;

pub struct HeuristicCurator {
    max_items: usize,
}

impl HeuristicCurator {
    pub fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    fn score(item: &CandidateItem, interests: &[String]) -> f64 {
        let haystack = format!(
            "{} {}",
            item.title.to_lowercase(),
            item.summary.as_deref().unwrap_or("").to_lowercase()
        );
        let mut score = 0.1; // every fresh item starts with a pulse
        for interest in interests {
            let needle = interest.to_lowercase();
            if !needle.is_empty() && haystack.contains(&needle) {
                score += 0.4;
            }
        }
        // Newer is better; undated items sit in the middle.
        if let Some(ts) = item.published_at {
            let age_hours = (Utc::now() - ts).num_hours().max(0) as f64;
            score += (48.0 - age_hours.min(48.0)) / 48.0 * 0.3;
        } else {
            score += 0.15;
        }
        score
    }

    fn blurb(item: &CandidateItem) -> String {
        match &item.summary {
            Some(s) if s.chars().count() > 240 => {
                let cut: String = s.chars().take(240).collect();
                format!("{cut}…")
            }
            Some(s) => s.clone(),
            None => format!("Fresh from {}.", item.source),
        }
    }
}

#[async_trait]
impl Curator for HeuristicCurator {
    async fn curate(
        &self,
        profile: &UserProfile,
        candidates: &[CandidateItem],
    ) -> Result<DigestContent> {
        let mut scored: Vec<(f64, &CandidateItem)> = candidates
            .iter()
            .map(|c| (Self::score(c, &profile.interests), c))
            .collect();

        // Decay near-duplicate titles so one wording of a story dominates
        // its copies instead of crowding the digest.
        for i in 0..scored.len() {
            for j in (i + 1)..scored.len() {
                let a = scored[i].1.title.to_lowercase();
                let b = scored[j].1.title.to_lowercase();
                if normalized_levenshtein(&a, &b) >= SIMILARITY_THRESHOLD {
                    scored[j].0 *= DUPLICATE_DECAY;
                }
            }
        }

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let items: Vec<DigestItem> = scored
            .into_iter()
            .take(self.max_items)
            .map(|(_, c)| DigestItem {
                title: c.title.clone(),
                url: c.url.clone(),
                source_label: c.source.label().to_string(),
                blurb: Self::blurb(c),
            })
            .collect();

        let date = Utc::now().format("%B %d, %Y");
        Ok(DigestContent {
            subject: format!("Your daily digest: {date}"),
            intro: format!("Hi {}, here is today's pick.", profile.name),
            items,
        })
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}
