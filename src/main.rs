//! Daily Digest Curator — Binary Entrypoint
//!
//! Three run modes, picked by the first CLI argument:
//!   run      one-shot pipeline: aggregate, filter, curate, deliver, record
//!   preview  everything except delivery and recording; prints to stdout
//!   serve    local HTTP API (health, preview, run, cache stats, metrics)
//!
//! See `README.md` for configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::sync::Mutex;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use daily_digest_curator::aggregate::providers::build_providers;
use daily_digest_curator::api::{create_router, AppState};
use daily_digest_curator::cache::SentStore;
use daily_digest_curator::config::{Settings, SourcesConfig, UserProfile};
use daily_digest_curator::curate::build_curator;
use daily_digest_curator::deliver::{build_delivery, render_email, Delivery};
use daily_digest_curator::metrics::Metrics;
use daily_digest_curator::pipeline::Pipeline;
use daily_digest_curator::validate::Validator;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("daily_digest_curator=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

fn build_pipeline(settings: &Settings, with_delivery: bool) -> Result<Pipeline> {
    let sources = SourcesConfig::load_or_default(&settings.sources_path);
    let providers = build_providers(&sources, settings.github_token.as_deref());
    let curator = build_curator(settings);
    let validator = Validator::load_default();
    let delivery: Option<Arc<dyn Delivery>> = if with_delivery {
        Some(build_delivery(settings)?)
    } else {
        None
    };

    info!(
        sources = providers.len(),
        curator = curator.name(),
        rules = validator.rule_count(),
        "pipeline assembled"
    );
    Ok(Pipeline::new(providers, curator, validator, delivery, settings))
}

async fn cmd_run(settings: &Settings) -> Result<()> {
    let profile = UserProfile::load_from_file(&settings.profile_path)?;
    let pipeline = build_pipeline(settings, true)?;
    let mut store = SentStore::load(
        &settings.cache_path,
        settings.retention_days,
        Utc::now().date_naive(),
    );

    let report = pipeline.run(&profile, &mut store).await?;
    info!(
        candidates = report.candidates,
        suppressed = report.suppressed,
        selected = report.selected,
        rejected = report.rejected,
        delivered = report.delivered,
        "run finished"
    );
    Ok(())
}

async fn cmd_preview(settings: &Settings) -> Result<()> {
    let profile = UserProfile::load_from_file(&settings.profile_path)?;
    let pipeline = build_pipeline(settings, false)?;
    let store = SentStore::load(
        &settings.cache_path,
        settings.retention_days,
        Utc::now().date_naive(),
    );

    match pipeline.preview(&profile, &store).await? {
        Some(content) => {
            let email = render_email(&profile, &content);
            println!("Subject: {}\n", email.subject);
            println!("{}", email.text);
        }
        None => println!("Nothing fresh today."),
    }
    Ok(())
}

async fn cmd_serve(settings: &Settings) -> Result<()> {
    let profile = UserProfile::load_from_file(&settings.profile_path)?;
    // Delivery is optional here; /digest/run reports the gap if it is absent.
    let delivery_configured =
        settings.resend_api_key.is_some() || std::env::var("SMTP_HOST").is_ok();
    if !delivery_configured {
        tracing::warn!("no delivery provider configured; /digest/run will fail until one is");
    }
    let pipeline = build_pipeline(settings, delivery_configured)?;
    let store = SentStore::load(
        &settings.cache_path,
        settings.retention_days,
        Utc::now().date_naive(),
    );

    let metrics = Metrics::init(settings.retention_days);
    let state = AppState {
        profile: Arc::new(profile),
        store: Arc::new(Mutex::new(store)),
        pipeline: Arc::new(pipeline),
    };
    let app = create_router(state).merge(metrics.router());

    let addr = format!("{}:{}", settings.api_host, settings.api_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "serving digest api");
    axum::serve(listener, app).await.context("server exited")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env in local/dev; no-op where the environment is already set.
    let _ = dotenvy::dotenv();
    init_tracing();

    let settings = Settings::from_env();
    let mode = std::env::args().nth(1).unwrap_or_else(|| "run".to_string());

    match mode.as_str() {
        "run" => cmd_run(&settings).await,
        "preview" => cmd_preview(&settings).await,
        "serve" => cmd_serve(&settings).await,
        other => anyhow::bail!("unknown mode '{other}' (expected run, preview, or serve)"),
    }
}
