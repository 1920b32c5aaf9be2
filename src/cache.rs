//! # Sent-content cache
//! Remembers fingerprints of recently delivered items so the same content is
//! not recommended again within the retention window.
//!
//! Layout on disk: one JSON file mapping `sent_on` date -> set of
//! fingerprints. The file is read once at startup and written back after a
//! confirmed send; a single writer is assumed. A missing or corrupt file
//! loads as an empty cache (fail open: a cache read error must never block
//! delivery).

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::aggregate::types::CandidateItem;

pub const DEFAULT_RETENTION_DAYS: i64 = 3;

/// Fingerprint of one delivered item: derived from the normalized URL,
/// falling back to the normalized title when the URL is empty.
pub fn fingerprint(item: &CandidateItem) -> String {
    match normalize_url(&item.url) {
        Some(url) => hash_hex(&format!("url:{url}")),
        None => hash_hex(&format!("title:{}", normalize_title(&item.title))),
    }
}

/// Canonical URL form for dedup comparison: lowercase scheme/host, fragment
/// and `utm_*` tracking params dropped, trailing slash trimmed.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut parsed = url::Url::parse(trimmed).ok()?;
    parsed.host_str()?;

    parsed.set_fragment(None);
    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        parsed
            .query_pairs_mut()
            .clear()
            .extend_pairs(kept.iter().map(|(k, v)| (k.as_str(), v.as_str())));
    }

    let mut out = parsed.to_string();
    while out.ends_with('/') {
        out.pop();
    }
    Some(out.to_lowercase())
}

fn normalize_title(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_space = false;
    for ch in s.chars() {
        let lc = ch.to_ascii_lowercase();
        if lc.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(lc);
            last_space = false;
        }
    }
    out.trim().to_string()
}

fn hash_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(32);
    for b in digest.iter().take(16) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub total_records: usize,
    pub oldest_date: Option<NaiveDate>,
    pub newest_date: Option<NaiveDate>,
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
struct CacheFile {
    days: BTreeMap<NaiveDate, BTreeSet<String>>,
}

/// The persisted dedup store. Owned by whoever runs the pipeline and passed
/// in explicitly; never a process-wide singleton.
#[derive(Debug)]
pub struct SentStore {
    path: PathBuf,
    retention_days: i64,
    days: BTreeMap<NaiveDate, BTreeSet<String>>,
}

impl SentStore {
    pub fn empty<P: AsRef<Path>>(path: P, retention_days: i64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            retention_days: retention_days.max(0),
            days: BTreeMap::new(),
        }
    }

    /// Load from disk, evicting expired dates. Unreadable or corrupt state
    /// degrades to an empty cache with a warning.
    pub fn load<P: AsRef<Path>>(path: P, retention_days: i64, as_of: NaiveDate) -> Self {
        let path = path.as_ref();
        let mut store = Self::empty(path, retention_days);

        match fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<CacheFile>(&raw) {
                Ok(file) => {
                    store.days = file.days;
                    store.evict(as_of);
                    debug!(records = store.stats().total_records, path = %path.display(), "loaded sent-content cache");
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "sent-content cache is corrupt; starting empty");
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no sent-content cache yet; starting empty");
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read sent-content cache; starting empty");
            }
        }

        store
    }

    /// True if `fp` was recorded within the retention window ending at
    /// `as_of`. Both edges are inclusive: recorded exactly
    /// `retention_days` ago still counts as sent.
    pub fn is_recently_sent(&self, fp: &str, as_of: NaiveDate) -> bool {
        self.days.iter().any(|(date, fps)| {
            let age = (as_of - *date).num_days();
            (0..=self.retention_days).contains(&age) && fps.contains(fp)
        })
    }

    /// Pure filter: returns the subset of `candidates` whose fingerprint has
    /// not been sent within the retention window. Never mutates the store.
    pub fn filter(&self, candidates: &[CandidateItem], as_of: NaiveDate) -> Vec<CandidateItem> {
        let mut fresh = Vec::with_capacity(candidates.len());
        let mut suppressed = 0usize;
        for item in candidates {
            if self.is_recently_sent(&fingerprint(item), as_of) {
                suppressed += 1;
                debug!(title = %item.title, "suppressing recently sent item");
            } else {
                fresh.push(item.clone());
            }
        }
        if suppressed > 0 {
            info!(suppressed, fresh = fresh.len(), "dedup filter applied");
            metrics::counter!("digest_cache_suppressed_total").increment(suppressed as u64);
        }
        fresh
    }

    /// Record delivered items under `as_of`. Call only after confirmed
    /// delivery; recording earlier would suppress content that was never
    /// actually sent. Expired dates are evicted first.
    pub fn record(&mut self, selected: &[CandidateItem], as_of: NaiveDate) {
        self.evict(as_of);
        let day = self.days.entry(as_of).or_default();
        for item in selected {
            day.insert(fingerprint(item));
        }
        debug!(added = selected.len(), date = %as_of, "recorded sent items");
    }

    /// Drop dates that have aged out of the retention window. Maintenance
    /// only: `filter` already bounds its own lookback.
    pub fn evict(&mut self, as_of: NaiveDate) {
        let retention = self.retention_days;
        let before = self.days.len();
        self.days
            .retain(|date, _| (as_of - *date).num_days() <= retention);
        let evicted = before - self.days.len();
        if evicted > 0 {
            debug!(evicted, "evicted expired cache dates");
        }
    }

    /// Write the cache to disk via temp file + rename (atomic whole-file
    /// replace; the only durability guarantee a single writer needs).
    pub fn persist(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating cache dir {}", parent.display()))?;
            }
        }
        let file = CacheFile {
            days: self.days.clone(),
        };
        let json = serde_json::to_string_pretty(&file).context("serializing cache")?;
        let tmp = self.path.with_extension("json.tmp");
        let mut f = fs::File::create(&tmp)
            .with_context(|| format!("creating {}", tmp.display()))?;
        f.write_all(json.as_bytes()).context("writing cache")?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("replacing {}", self.path.display()))?;
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_records: self.days.values().map(BTreeSet::len).sum(),
            oldest_date: self.days.keys().next().copied(),
            newest_date: self.days.keys().next_back().copied(),
        }
    }

    pub fn retention_days(&self) -> i64 {
        self.retention_days
    }
}
