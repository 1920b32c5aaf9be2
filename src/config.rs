// src/config.rs
//! Environment and file configuration: runtime settings from env vars
//! (loaded through `dotenvy` in the binary), the user profile and the
//! source list from TOML files.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::aggregate::MissingDatePolicy;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Runtime settings. Everything has a default so a bare checkout can run
/// `preview` with no environment at all.
#[derive(Debug, Clone)]
pub struct Settings {
    pub anthropic_api_key: Option<String>,
    pub anthropic_model: String,
    pub resend_api_key: Option<String>,
    pub from_email: String,
    pub github_token: Option<String>,
    pub api_host: String,
    pub api_port: u16,
    pub cache_path: PathBuf,
    pub retention_days: i64,
    pub max_items: usize,
    pub max_attempts: usize,
    pub source_timeout_secs: u64,
    pub missing_date_policy: MissingDatePolicy,
    pub sources_path: PathBuf,
    pub profile_path: PathBuf,
}

impl Settings {
    pub fn from_env() -> Self {
        let missing_date_policy = match std::env::var("MISSING_DATE_POLICY")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str()
        {
            "exclude" => MissingDatePolicy::Exclude,
            _ => MissingDatePolicy::Include,
        };

        Self {
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            anthropic_model: env_opt("ANTHROPIC_MODEL")
                .unwrap_or_else(|| "claude-sonnet-4-20250514".to_string()),
            resend_api_key: env_opt("RESEND_API_KEY"),
            from_email: env_opt("FROM_EMAIL")
                .unwrap_or_else(|| "Daily Digest <digest@localhost>".to_string()),
            github_token: env_opt("GITHUB_TOKEN"),
            api_host: env_opt("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            api_port: env_or("API_PORT", 8000),
            cache_path: PathBuf::from(
                env_opt("CACHE_PATH").unwrap_or_else(|| "cache/sent_history.json".to_string()),
            ),
            retention_days: env_or("RETENTION_DAYS", crate::cache::DEFAULT_RETENTION_DAYS),
            max_items: env_or("MAX_DIGEST_ITEMS", 5),
            max_attempts: env_or("MAX_CURATION_ATTEMPTS", 3),
            source_timeout_secs: env_or("SOURCE_TIMEOUT_SECS", 30),
            missing_date_policy,
            sources_path: PathBuf::from(
                env_opt("SOURCES_CONFIG_PATH").unwrap_or_else(|| "config/sources.toml".to_string()),
            ),
            profile_path: PathBuf::from(
                env_opt("PROFILE_PATH").unwrap_or_else(|| "config/profile.toml".to_string()),
            ),
        }
    }
}

/// Who the digest is for. Interests steer curation; the email address is the
/// delivery target.
#[derive(Debug, Clone, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub github_username: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl UserProfile {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading profile {}", path.as_ref().display()))?;
        toml::from_str(&raw).context("parsing profile toml")
    }
}

// --- source list ---

fn default_true() -> bool {
    true
}
fn default_github_recency() -> i64 {
    3
}
fn default_hn_recency() -> i64 {
    2
}
fn default_min_score() -> i64 {
    30
}
fn default_max_items_10() -> usize {
    10
}
fn default_max_items_15() -> usize {
    15
}
fn default_feed_recency() -> i64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubSourceCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_github_recency")]
    pub recency_days: i64,
    #[serde(default = "default_max_items_10")]
    pub max_items: usize,
}

impl Default for GithubSourceCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            recency_days: default_github_recency(),
            max_items: default_max_items_10(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HackerNewsSourceCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_hn_recency")]
    pub recency_days: i64,
    #[serde(default = "default_max_items_15")]
    pub max_items: usize,
    #[serde(default = "default_min_score")]
    pub min_score: i64,
}

impl Default for HackerNewsSourceCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            recency_days: default_hn_recency(),
            max_items: default_max_items_15(),
            min_score: default_min_score(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DevpostSourceCfg {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_items_10")]
    pub max_items: usize,
}

impl Default for DevpostSourceCfg {
    fn default() -> Self {
        Self {
            enabled: true,
            max_items: default_max_items_10(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedCfg {
    pub name: String,
    pub url: String,
    #[serde(default = "default_feed_recency")]
    pub recency_days: i64,
    #[serde(default = "default_max_items_10")]
    pub max_items: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub github: GithubSourceCfg,
    #[serde(default)]
    pub hackernews: HackerNewsSourceCfg,
    #[serde(default)]
    pub devpost: DevpostSourceCfg,
    #[serde(default)]
    pub feeds: Vec<FeedCfg>,
}

impl SourcesConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading sources config {}", path.as_ref().display()))?;
        toml::from_str(&raw).context("parsing sources toml")
    }

    /// Load the configured file; a missing file means defaults (all built-in
    /// sources on, no news feeds).
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        if path.as_ref().exists() {
            match Self::load_from_file(path.as_ref()) {
                Ok(cfg) => return cfg,
                Err(e) => {
                    tracing::warn!(path = %path.as_ref().display(), error = %e, "sources config unusable; using defaults");
                }
            }
        }
        Self::default()
    }
}
