// src/aggregate/providers/mod.rs
pub mod devpost;
pub mod github_trending;
pub mod hackernews;
pub mod news_rss;

use std::sync::Arc;

use crate::aggregate::types::SourceProvider;
use crate::config::SourcesConfig;

use devpost::DevpostProvider;
use github_trending::GithubTrendingProvider;
use hackernews::HackerNewsProvider;
use news_rss::NewsRssProvider;

/// Instantiate every enabled provider from the sources config.
pub fn build_providers(
    cfg: &SourcesConfig,
    github_token: Option<&str>,
) -> Vec<Arc<dyn SourceProvider>> {
    let mut providers: Vec<Arc<dyn SourceProvider>> = Vec::new();

    if cfg.github.enabled {
        providers.push(Arc::new(GithubTrendingProvider::new(
            github_token.map(str::to_string),
            cfg.github.recency_days,
            cfg.github.max_items,
        )));
    }
    if cfg.hackernews.enabled {
        providers.push(Arc::new(HackerNewsProvider::new(
            cfg.hackernews.recency_days,
            cfg.hackernews.max_items,
            cfg.hackernews.min_score,
        )));
    }
    if cfg.devpost.enabled {
        providers.push(Arc::new(DevpostProvider::new(cfg.devpost.max_items)));
    }
    for feed in &cfg.feeds {
        providers.push(Arc::new(NewsRssProvider::new(
            &feed.name,
            &feed.url,
            feed.recency_days,
            feed.max_items,
        )));
    }

    providers
}
