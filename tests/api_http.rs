// tests/api_http.rs
// Smoke tests for the HTTP surface, driven through tower::ServiceExt
// without binding a socket.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::Utc;
use tokio::sync::Mutex;
use tower::ServiceExt; // for `oneshot` (tower 0.5 with features=["util"])

use daily_digest_curator::aggregate::types::{CandidateItem, SourceKind, SourceProvider};
use daily_digest_curator::aggregate::MissingDatePolicy;
use daily_digest_curator::api::{create_router, AppState};
use daily_digest_curator::cache::SentStore;
use daily_digest_curator::config::{Settings, UserProfile};
use daily_digest_curator::curate::HeuristicCurator;
use daily_digest_curator::pipeline::Pipeline;
use daily_digest_curator::validate::Validator;

struct OneItemProvider;

#[async_trait::async_trait]
impl SourceProvider for OneItemProvider {
    async fn fetch_latest(&self) -> anyhow::Result<Vec<CandidateItem>> {
        Ok(vec![CandidateItem {
            title: "Rust 1.81 released".into(),
            url: "https://example.com/rust-1-81".into(),
            source: SourceKind::HackerNews,
            published_at: Some(Utc::now()),
            summary: Some("Release notes.".into()),
        }])
    }
    fn name(&self) -> &str {
        "stub"
    }
    fn recency_days(&self) -> i64 {
        2
    }
    fn max_items(&self) -> usize {
        5
    }
}

fn test_app(cache_path: PathBuf) -> Router {
    let settings = Settings {
        anthropic_api_key: None,
        anthropic_model: "unused".into(),
        resend_api_key: None,
        from_email: "Digest <digest@example.com>".into(),
        github_token: None,
        api_host: "127.0.0.1".into(),
        api_port: 0,
        cache_path: cache_path.clone(),
        retention_days: 3,
        max_items: 5,
        max_attempts: 3,
        source_timeout_secs: 5,
        missing_date_policy: MissingDatePolicy::Include,
        sources_path: PathBuf::from("unused"),
        profile_path: PathBuf::from("unused"),
    };
    let pipeline = Pipeline::new(
        vec![Arc::new(OneItemProvider)],
        Arc::new(HeuristicCurator::new(settings.max_items)),
        Validator::builtin(),
        None,
        &settings,
    );
    let profile = UserProfile {
        name: "Jo".into(),
        email: "jo@example.com".into(),
        github_username: None,
        interests: vec!["rust".into()],
        location: None,
    };
    create_router(AppState {
        profile: Arc::new(profile),
        store: Arc::new(Mutex::new(SentStore::empty(cache_path, 3))),
        pipeline: Arc::new(pipeline),
    })
}

#[tokio::test]
async fn health_reports_the_service() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path().join("sent.json"));

    let resp = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let s = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(s.contains("\"healthy\""));
    assert!(s.contains("daily-digest-curator"));
}

#[tokio::test]
async fn preview_returns_a_digest_without_recording() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path().join("sent.json"));

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/digest/preview")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let s = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(s.contains("https://example.com/rust-1-81"), "body: {s}");

    // Preview must not touch the cache.
    let resp = app
        .oneshot(
            Request::builder()
                .uri("/cache/stats")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let s = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(s.contains("\"total_records\":0"), "body: {s}");
}

#[tokio::test]
async fn run_without_a_delivery_provider_is_a_500_not_a_panic() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path().join("sent.json"));

    let resp = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/digest/run")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
