//! # Digest pipeline
//! One run = aggregate -> dedup filter -> curate -> validate -> deliver ->
//! record. The ordering at the end is the load-bearing part: fingerprints
//! are recorded and persisted only after the delivery provider confirms the
//! send, so a failed send can never suppress content that nobody received.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use metrics::{counter, describe_counter, gauge};
use once_cell::sync::OnceCell;
use tracing::{info, warn};

use crate::aggregate::types::{CandidateItem, SourceProvider};
use crate::aggregate::{collect_candidates, MissingDatePolicy};
use crate::cache::SentStore;
use crate::config::{Settings, UserProfile};
use crate::curate::{Curator, DigestContent};
use crate::deliver::{render_email, Delivery};
use crate::validate::Validator;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "digest_candidates_total",
            "Candidates collected across all sources."
        );
        describe_counter!(
            "digest_source_errors_total",
            "Source fetches that errored or timed out."
        );
        describe_counter!(
            "digest_source_items_total",
            "Raw items parsed out of source payloads."
        );
        describe_counter!(
            "digest_cache_suppressed_total",
            "Candidates suppressed by the sent-content cache."
        );
        describe_counter!(
            "digest_validation_rejects_total",
            "Curated items rejected by validation rules."
        );
        describe_counter!("digest_runs_total", "Completed pipeline runs.");
        describe_counter!("digest_deliveries_total", "Confirmed deliveries.");
        describe_counter!(
            "digest_delivery_failures_total",
            "Delivery attempts that failed."
        );
    });
}

/// What a run did, for logs and the HTTP API.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunReport {
    pub candidates: usize,
    pub suppressed: usize,
    pub selected: usize,
    pub rejected: usize,
    pub delivered: bool,
}

pub struct Pipeline {
    providers: Vec<Arc<dyn SourceProvider>>,
    curator: Arc<dyn Curator>,
    validator: Validator,
    delivery: Option<Arc<dyn Delivery>>,
    max_attempts: usize,
    missing_date_policy: MissingDatePolicy,
    source_timeout: Duration,
}

impl Pipeline {
    pub fn new(
        providers: Vec<Arc<dyn SourceProvider>>,
        curator: Arc<dyn Curator>,
        validator: Validator,
        delivery: Option<Arc<dyn Delivery>>,
        settings: &Settings,
    ) -> Self {
        ensure_metrics_described();
        gauge!("digest_cache_retention_days").set(settings.retention_days as f64);
        Self {
            providers,
            curator,
            validator,
            delivery,
            max_attempts: settings.max_attempts.max(1),
            missing_date_policy: settings.missing_date_policy,
            source_timeout: Duration::from_secs(settings.source_timeout_secs),
        }
    }

    /// Aggregate and dedup-filter; the shared front half of preview and run.
    async fn fresh_candidates(&self, store: &SentStore) -> (Vec<CandidateItem>, usize) {
        let today = Utc::now().date_naive();
        let collected =
            collect_candidates(&self.providers, self.missing_date_policy, self.source_timeout)
                .await;
        let fresh = store.filter(&collected, today);
        let suppressed = collected.len() - fresh.len();
        info!(
            candidates = collected.len(),
            suppressed,
            fresh = fresh.len(),
            "candidate pool assembled"
        );
        (fresh, suppressed)
    }

    /// Curate and validate, retrying when validation guts the selection.
    /// Rejected items are dropped, never padded over.
    async fn curate_validated(
        &self,
        profile: &UserProfile,
        fresh: &[CandidateItem],
    ) -> Result<(DigestContent, usize)> {
        let mut rejected_total = 0usize;

        for attempt in 1..=self.max_attempts {
            let mut content = self
                .curator
                .curate(profile, fresh)
                .await
                .with_context(|| format!("curation attempt {attempt} failed"))?;

            let mut kept = Vec::with_capacity(content.items.len());
            for item in content.items {
                let violations = self
                    .validator
                    .verdict(&format!("{} {}", item.title, item.blurb));
                if violations.is_empty() {
                    kept.push(item);
                } else {
                    rejected_total += 1;
                    counter!("digest_validation_rejects_total").increment(1);
                    warn!(
                        title = %item.title,
                        rules = ?violations.iter().map(|v| v.rule.as_str()).collect::<Vec<_>>(),
                        "validation rejected item"
                    );
                }
            }

            if !kept.is_empty() {
                content.items = kept;
                return Ok((content, rejected_total));
            }
            warn!(attempt, "validation rejected every item; retrying curation");
        }

        anyhow::bail!(
            "no curated item survived validation after {} attempts",
            self.max_attempts
        )
    }

    /// Steps 1-4 only: no delivery, no recording. `None` when the pool is
    /// empty after dedup.
    pub async fn preview(
        &self,
        profile: &UserProfile,
        store: &SentStore,
    ) -> Result<Option<DigestContent>> {
        let (fresh, _) = self.fresh_candidates(store).await;
        if fresh.is_empty() {
            return Ok(None);
        }
        let (content, _) = self.curate_validated(profile, &fresh).await?;
        Ok(Some(content))
    }

    /// The full daily run.
    pub async fn run(&self, profile: &UserProfile, store: &mut SentStore) -> Result<RunReport> {
        let delivery = self
            .delivery
            .as_ref()
            .context("no delivery provider configured")?;

        let today = Utc::now().date_naive();
        let (fresh, suppressed) = self.fresh_candidates(store).await;
        let candidates = fresh.len() + suppressed;

        if fresh.is_empty() {
            info!("no fresh candidates; skipping this run");
            counter!("digest_runs_total").increment(1);
            return Ok(RunReport {
                candidates,
                suppressed,
                selected: 0,
                rejected: 0,
                delivered: false,
            });
        }

        let (content, rejected) = self.curate_validated(profile, &fresh).await?;
        let selected = content.items.len();

        let email = render_email(profile, &content);
        if let Err(e) = delivery.send(&email).await {
            counter!("digest_delivery_failures_total").increment(1);
            return Err(e.context("delivery failed; nothing recorded"));
        }
        counter!("digest_deliveries_total").increment(1);

        // Only now is it safe to remember these as sent.
        let sent: Vec<CandidateItem> = fresh
            .iter()
            .filter(|c| content.items.iter().any(|i| i.url == c.url))
            .cloned()
            .collect();
        store.record(&sent, today);
        store
            .persist()
            .context("digest was delivered but the sent-content cache failed to persist; expect repeats until this is fixed")?;

        counter!("digest_runs_total").increment(1);
        info!(selected, rejected, to = %profile.email, "digest run complete");

        Ok(RunReport {
            candidates,
            suppressed,
            selected,
            rejected,
            delivered: true,
        })
    }
}
