// src/aggregate/mod.rs
pub mod providers;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::aggregate::types::{CandidateItem, SourceProvider};

/// What to do with an item whose publish date could not be determined.
///
/// `Include` treats undated items as always fresh (the default: opportunity
/// boards rarely date their listings). `Exclude` drops them as always stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MissingDatePolicy {
    #[default]
    Include,
    Exclude,
}

/// Normalize text coming out of feeds: decode HTML entities, strip tags,
/// fold fancy quotes to ASCII, collapse whitespace, cap length.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| regex::Regex::new(r"(?is)</?[^>]+>").unwrap());
    out = re_tags.replace_all(&out, "").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: once_cell::sync::OnceCell<regex::Regex> = once_cell::sync::OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| regex::Regex::new(r"\s+").unwrap());
    out = re_ws.replace_all(&out, " ").to_string();
    out = out.trim().to_string();

    // 5) Length cap: 1500 chars
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// True if `raw` parses as an absolute http(s) URL with a host.
pub fn is_usable_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(u) => matches!(u.scheme(), "http" | "https") && u.host_str().is_some(),
        Err(_) => false,
    }
}

/// Normalize + filter one provider's raw output:
/// - titles and summaries are normalized; empty titles are dropped,
/// - items without a usable URL are dropped,
/// - dated items older than `recency_days` are dropped (the window edge is
///   inclusive: age == window is still fresh),
/// - undated items follow `policy`,
/// - the result is capped at `max_items`.
pub fn sanitize_batch(
    raw: Vec<CandidateItem>,
    now: DateTime<Utc>,
    recency_days: i64,
    max_items: usize,
    policy: MissingDatePolicy,
) -> Vec<CandidateItem> {
    let cutoff = now - chrono::Duration::days(recency_days);
    let mut kept = Vec::with_capacity(raw.len().min(max_items));
    let mut dropped = 0usize;

    for mut item in raw {
        item.title = normalize_text(&item.title);
        item.summary = item
            .summary
            .as_deref()
            .map(normalize_text)
            .filter(|s| !s.is_empty());

        let fresh = match item.published_at {
            Some(ts) => ts >= cutoff,
            None => policy == MissingDatePolicy::Include,
        };
        let keep = fresh && !item.title.is_empty() && is_usable_url(&item.url);
        if !keep {
            dropped += 1;
            continue;
        }
        kept.push(item);
        if kept.len() == max_items {
            break;
        }
    }

    if dropped > 0 {
        debug!(dropped, kept = kept.len(), "sanitized provider batch");
    }
    kept
}

/// Fan out to all providers concurrently and join on every handle.
///
/// Each provider runs as its own task under a shared `source_timeout`. A
/// provider that errors, times out, or panics contributes zero items and a
/// warning; it never aborts collection from the others. The output is the
/// concatenation of per-source results in join order (no ordering guarantee,
/// no cross-source dedup here).
pub async fn collect_candidates(
    providers: &[Arc<dyn SourceProvider>],
    policy: MissingDatePolicy,
    source_timeout: Duration,
) -> Vec<CandidateItem> {
    let now = Utc::now();
    let mut set = JoinSet::new();

    for provider in providers {
        let provider = Arc::clone(provider);
        set.spawn(async move {
            let name = provider.name().to_string();
            match tokio::time::timeout(source_timeout, provider.fetch_latest()).await {
                Err(_) => {
                    warn!(source = %name, timeout_secs = source_timeout.as_secs(), "source timed out");
                    counter!("digest_source_errors_total").increment(1);
                    Vec::new()
                }
                Ok(Err(e)) => {
                    warn!(source = %name, error = ?e, "source fetch failed");
                    counter!("digest_source_errors_total").increment(1);
                    Vec::new()
                }
                Ok(Ok(raw)) => {
                    let kept = sanitize_batch(
                        raw,
                        now,
                        provider.recency_days(),
                        provider.max_items(),
                        policy,
                    );
                    debug!(source = %name, kept = kept.len(), "source fetched");
                    kept
                }
            }
        });
    }

    let mut all = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(items) => all.extend(items),
            Err(e) => {
                warn!(error = ?e, "source task failed to join");
                counter!("digest_source_errors_total").increment(1);
            }
        }
    }

    counter!("digest_candidates_total").increment(all.len() as u64);
    all
}
