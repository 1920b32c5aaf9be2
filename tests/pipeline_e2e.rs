// tests/pipeline_e2e.rs
// The whole pipeline against stub sources and a stub delivery provider:
// partial source failure, dedup against a warm cache, bounded selection,
// and the record-only-after-delivery invariant.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;

use daily_digest_curator::aggregate::types::{CandidateItem, SourceKind, SourceProvider};
use daily_digest_curator::aggregate::MissingDatePolicy;
use daily_digest_curator::cache::{fingerprint, SentStore};
use daily_digest_curator::config::{Settings, UserProfile};
use daily_digest_curator::curate::HeuristicCurator;
use daily_digest_curator::deliver::{Delivery, DigestEmail};
use daily_digest_curator::pipeline::Pipeline;
use daily_digest_curator::validate::Validator;

struct FixedProvider {
    name: &'static str,
    items: Vec<CandidateItem>,
}

#[async_trait]
impl SourceProvider for FixedProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        Ok(self.items.clone())
    }
    fn name(&self) -> &str {
        self.name
    }
    fn recency_days(&self) -> i64 {
        7
    }
    fn max_items(&self) -> usize {
        15
    }
}

struct FailingProvider;

#[async_trait]
impl SourceProvider for FailingProvider {
    async fn fetch_latest(&self) -> Result<Vec<CandidateItem>> {
        anyhow::bail!("dns failure")
    }
    fn name(&self) -> &str {
        "down"
    }
    fn recency_days(&self) -> i64 {
        7
    }
    fn max_items(&self) -> usize {
        15
    }
}

#[derive(Clone, Default)]
struct StubDelivery {
    fail: bool,
    sent: Arc<Mutex<Vec<DigestEmail>>>,
}

#[async_trait]
impl Delivery for StubDelivery {
    async fn send(&self, email: &DigestEmail) -> Result<()> {
        if self.fail {
            anyhow::bail!("smtp 550");
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
    fn name(&self) -> &'static str {
        "stub"
    }
}

fn settings(cache_path: PathBuf) -> Settings {
    Settings {
        anthropic_api_key: None,
        anthropic_model: "unused".into(),
        resend_api_key: None,
        from_email: "Digest <digest@example.com>".into(),
        github_token: None,
        api_host: "127.0.0.1".into(),
        api_port: 0,
        cache_path,
        retention_days: 3,
        max_items: 5,
        max_attempts: 3,
        source_timeout_secs: 5,
        missing_date_policy: MissingDatePolicy::Include,
        sources_path: PathBuf::from("unused"),
        profile_path: PathBuf::from("unused"),
    }
}

fn profile() -> UserProfile {
    UserProfile {
        name: "Jo".into(),
        email: "jo@example.com".into(),
        github_username: None,
        interests: vec!["rust".into()],
        location: None,
    }
}

fn item(n: usize, source: &str) -> CandidateItem {
    CandidateItem {
        title: format!("{source} story {n}"),
        url: format!("https://{source}.example.com/{n}"),
        source: SourceKind::NewsSite(source.to_string()),
        published_at: Some(Utc::now() - chrono::Duration::hours(n as i64)),
        summary: Some(format!("Release notes for {source} item {n}.")),
    }
}

fn pipeline(
    providers: Vec<Arc<dyn SourceProvider>>,
    delivery: StubDelivery,
    cache_path: PathBuf,
) -> Pipeline {
    let cfg = settings(cache_path);
    Pipeline::new(
        providers,
        Arc::new(HeuristicCurator::new(cfg.max_items)),
        Validator::builtin(),
        Some(Arc::new(delivery)),
        &cfg,
    )
}

#[tokio::test]
async fn full_run_dedups_selects_and_records_only_new_fingerprints() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("sent.json");
    let today = Utc::now().date_naive();

    // Three sources: 10 items, a dead one, 5 items.
    let alpha: Vec<CandidateItem> = (0..10).map(|n| item(n, "alpha")).collect();
    let beta: Vec<CandidateItem> = (0..5).map(|n| item(n, "beta")).collect();
    let providers: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(FixedProvider {
            name: "alpha",
            items: alpha.clone(),
        }),
        Arc::new(FailingProvider),
        Arc::new(FixedProvider {
            name: "beta",
            items: beta.clone(),
        }),
    ];

    // Warm cache: two of the fifteen were sent yesterday.
    let mut store = SentStore::empty(&cache_path, 3);
    let already_sent = vec![alpha[0].clone(), beta[0].clone()];
    store.record(&already_sent, today - chrono::Duration::days(1));
    let preexisting: Vec<String> = already_sent.iter().map(fingerprint).collect();

    let delivery = StubDelivery::default();
    let report = pipeline(providers, delivery.clone(), cache_path.clone())
        .run(&profile(), &mut store)
        .await
        .unwrap();

    assert!(report.delivered);
    assert_eq!(report.candidates, 15);
    assert_eq!(report.suppressed, 2);
    assert!(report.selected >= 1 && report.selected <= 5);

    // The delivered email never repeats the previously sent urls.
    let sent = delivery.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert!(!sent[0].text.contains(&alpha[0].url));
    assert!(!sent[0].text.contains(&beta[0].url));

    // Everything recorded today is new relative to the warm cache.
    let reloaded = SentStore::load(&cache_path, 3, today);
    let stats = reloaded.stats();
    assert_eq!(stats.total_records, preexisting.len() + report.selected);
    for fp in &preexisting {
        assert!(reloaded.is_recently_sent(fp, today));
    }
}

#[tokio::test]
async fn failed_delivery_records_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("sent.json");
    let today = Utc::now().date_naive();

    let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(FixedProvider {
        name: "alpha",
        items: (0..5).map(|n| item(n, "alpha")).collect(),
    })];

    let mut store = SentStore::empty(&cache_path, 3);
    let delivery = StubDelivery {
        fail: true,
        ..Default::default()
    };

    let err = pipeline(providers, delivery, cache_path.clone())
        .run(&profile(), &mut store)
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("delivery failed"));

    // Nothing in memory, nothing on disk: the items stay eligible.
    assert_eq!(store.stats().total_records, 0);
    assert!(!cache_path.exists());
    let reloaded = SentStore::load(&cache_path, 3, today);
    assert_eq!(reloaded.stats().total_records, 0);
}

#[tokio::test]
async fn a_fully_suppressed_pool_skips_the_send() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("sent.json");
    let today = Utc::now().date_naive();

    let items: Vec<CandidateItem> = (0..3).map(|n| item(n, "alpha")).collect();
    let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(FixedProvider {
        name: "alpha",
        items: items.clone(),
    })];

    let mut store = SentStore::empty(&cache_path, 3);
    store.record(&items, today);

    let delivery = StubDelivery::default();
    let report = pipeline(providers, delivery.clone(), cache_path)
        .run(&profile(), &mut store)
        .await
        .unwrap();

    assert!(!report.delivered);
    assert_eq!(report.suppressed, 3);
    assert_eq!(report.selected, 0);
    assert!(delivery.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn back_to_back_runs_do_not_repeat_content() {
    let dir = tempfile::tempdir().unwrap();
    let cache_path = dir.path().join("sent.json");

    let items: Vec<CandidateItem> = (0..4).map(|n| item(n, "alpha")).collect();
    let providers: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(FixedProvider {
        name: "alpha",
        items: items.clone(),
    })];
    let delivery = StubDelivery::default();
    let pipe = pipeline(providers, delivery.clone(), cache_path.clone());

    let mut store = SentStore::empty(&cache_path, 3);
    let first = pipe.run(&profile(), &mut store).await.unwrap();
    assert!(first.delivered);
    assert_eq!(first.selected, 4);

    // Same sources an hour later: everything was just sent.
    let second = pipe.run(&profile(), &mut store).await.unwrap();
    assert!(!second.delivered);
    assert_eq!(second.suppressed, 4);
    assert_eq!(delivery.sent.lock().unwrap().len(), 1);
}
