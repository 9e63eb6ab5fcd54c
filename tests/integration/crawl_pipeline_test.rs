// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::helpers::memory_repo::{MemoryManifestRepository, RecordingHook};
use crate::helpers::{crawl_settings, fetcher, manifest_json, validator};
use chrono::{DateTime, Duration, Utc};
use fundcrawl::config::settings::CrawlSettings;
use fundcrawl::domain::models::crawl_job::ManifestStatus;
use fundcrawl::workers::crawl_worker::CrawlError;
use fundcrawl::workers::CrawlManager;
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn manager(
    settings: CrawlSettings,
    repo: Arc<MemoryManifestRepository>,
    hook: Arc<RecordingHook>,
) -> CrawlManager<MemoryManifestRepository, fundcrawl::engines::reqwest_engine::ReqwestFetchClient>
{
    CrawlManager::new(settings, repo, fetcher(), validator()).with_hook(hook)
}

async fn mount_head(server: &MockServer, status: u16) {
    Mock::given(method("HEAD"))
        .and(path("/funding.json"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_valid_manifest_is_stored_and_reported() {
    let server = MockServer::start().await;
    let base = server.uri();
    mount_head(&server, 200).await;
    Mock::given(method("GET"))
        .and(path("/funding.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json(&base)))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&format!("{}/funding.json", base), ManifestStatus::Pending, 2);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(crawl_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.queued, 1);
    assert_eq!(summary.stored, 1);

    let row = repo.get(id);
    assert_eq!(row.status, ManifestStatus::Pending);
    assert_eq!(row.crawl_errors, 0);
    assert_eq!(row.guid, "@127.0.0.1");
    assert!(row.body.unwrap().contains("Acme Labs"));

    assert_eq!(hook.calls(), vec![(id, true, ManifestStatus::Pending)]);
}

#[tokio::test]
async fn test_unmodified_manifest_is_skipped_without_writes() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/funding.json"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Last-Modified", "Wed, 21 Oct 2015 07:28:00 GMT"),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    repo.add(&format!("{}/funding.json", server.uri()), ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(crawl_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(repo.writes(), 0);
    assert!(hook.calls().is_empty());
}

#[tokio::test]
async fn test_newer_last_modified_fetches_and_stores() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("HEAD"))
        .and(path("/funding.json"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Last-Modified", Utc::now().to_rfc2822().as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/funding.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json(&base)))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&format!("{}/funding.json", base), ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(crawl_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.stored, 1);
    assert_eq!(repo.writes(), 1);
    assert!(repo.get(id).body.is_some());
    assert_eq!(hook.calls(), vec![(id, true, ManifestStatus::Active)]);
}

#[tokio::test]
async fn test_equal_last_modified_is_not_modified() {
    let server = MockServer::start().await;
    // HTTP dates carry whole seconds only.
    let stored_at =
        DateTime::<Utc>::from_timestamp((Utc::now() - Duration::days(2)).timestamp(), 0).unwrap();
    Mock::given(method("HEAD"))
        .and(path("/funding.json"))
        .respond_with(
            ResponseTemplate::new(200).insert_header("Last-Modified", stored_at.to_rfc2822().as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    repo.add_at(
        &format!("{}/funding.json", server.uri()),
        ManifestStatus::Active,
        0,
        stored_at,
    );
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(crawl_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(repo.writes(), 0);
    assert!(hook.calls().is_empty());
}

#[tokio::test]
async fn test_missing_manifest_counts_a_crawl_error() {
    let server = MockServer::start().await;
    mount_head(&server, 404).await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&format!("{}/funding.json", server.uri()), ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(crawl_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.fetch_failed, 1);
    let row = repo.get(id);
    assert_eq!(row.crawl_errors, 1);
    assert_eq!(row.status, ManifestStatus::Active);
    assert!(row.crawl_message.contains("404"));
    assert_eq!(hook.calls(), vec![(id, false, ManifestStatus::Active)]);
}

#[tokio::test]
async fn test_repeated_errors_disable_manifest() {
    let server = MockServer::start().await;
    mount_head(&server, 500).await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&format!("{}/funding.json", server.uri()), ManifestStatus::Active, 1);
    let hook = Arc::new(RecordingHook::default());

    let settings = CrawlSettings {
        max_crawl_errors: 1,
        ..crawl_settings()
    };
    let (_stop_tx, stop_rx) = watch::channel(false);
    manager(settings, repo.clone(), hook.clone()).run(stop_rx).await;

    let row = repo.get(id);
    assert_eq!(row.crawl_errors, 2);
    assert_eq!(row.status, ManifestStatus::Disabled);
    assert_eq!(hook.calls(), vec![(id, false, ManifestStatus::Disabled)]);
}

#[tokio::test]
async fn test_invalid_manifest_is_recorded_not_stored() {
    let server = MockServer::start().await;
    let base = server.uri();
    let mut body = manifest_json(&base);
    body["funding"]["plans"][0]["channels"] = serde_json::json!(["crypto"]);

    mount_head(&server, 200).await;
    Mock::given(method("GET"))
        .and(path("/funding.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&format!("{}/funding.json", base), ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(crawl_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.invalid, 1);
    let row = repo.get(id);
    assert!(row.body.is_none());
    assert_eq!(row.crawl_errors, 1);
    assert!(row.crawl_message.contains("crypto"));
    assert_eq!(hook.calls(), vec![(id, false, ManifestStatus::Active)]);
}

/// 清单在 `manifest_host`，仓库链接指向另一个主机并带证明文档
async fn mount_cross_host_manifest(
    manifest_host: &MockServer,
    repo_host: &MockServer,
    attestation: String,
) {
    let base = manifest_host.uri();
    let other = repo_host.uri();
    let mut body = manifest_json(&base);
    body["projects"][0]["repositoryUrl"] = serde_json::json!({
        "url": format!("{}/widget", other),
        "wellKnown": format!("{}/widget/.well-known/funding-manifest-urls", other),
    });

    mount_head(manifest_host, 200).await;
    Mock::given(method("GET"))
        .and(path("/funding.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(manifest_host)
        .await;
    Mock::given(method("GET"))
        .and(path("/widget/.well-known/funding-manifest-urls"))
        .respond_with(ResponseTemplate::new(200).set_body_string(attestation))
        .expect(1)
        .mount(repo_host)
        .await;
}

fn provenance_settings() -> CrawlSettings {
    CrawlSettings {
        check_provenance: true,
        ..crawl_settings()
    }
}

#[tokio::test]
async fn test_remote_attestation_listing_manifest_is_stored() {
    let manifest_host = MockServer::start().await;
    let repo_host = MockServer::start().await;
    let manifest_url = format!("{}/funding.json", manifest_host.uri());
    mount_cross_host_manifest(
        &manifest_host,
        &repo_host,
        format!("https://elsewhere.example/funding.json\n  {}  \n", manifest_url),
    )
    .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&manifest_url, ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(provenance_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.stored, 1);
    assert!(repo.get(id).body.is_some());
    assert_eq!(hook.calls(), vec![(id, true, ManifestStatus::Active)]);
}

#[tokio::test]
async fn test_remote_attestation_without_manifest_is_invalid() {
    let manifest_host = MockServer::start().await;
    let repo_host = MockServer::start().await;
    let manifest_url = format!("{}/funding.json", manifest_host.uri());
    mount_cross_host_manifest(
        &manifest_host,
        &repo_host,
        "https://elsewhere.example/funding.json\n".to_string(),
    )
    .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&manifest_url, ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(provenance_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.invalid, 1);
    let row = repo.get(id);
    assert!(row.body.is_none());
    assert_eq!(row.crawl_errors, 1);
    assert!(row.crawl_message.contains("projects[0].repositoryUrl"));
    assert_eq!(hook.calls(), vec![(id, false, ManifestStatus::Active)]);
}

#[tokio::test]
async fn test_unreachable_attestation_is_invalid() {
    let manifest_host = MockServer::start().await;
    let repo_host = MockServer::start().await;
    let manifest_url = format!("{}/funding.json", manifest_host.uri());

    let mut body = manifest_json(&manifest_host.uri());
    body["projects"][0]["repositoryUrl"] = serde_json::json!({
        "url": format!("{}/widget", repo_host.uri()),
        "wellKnown": format!("{}/widget/.well-known/funding-manifest-urls", repo_host.uri()),
    });
    mount_head(&manifest_host, 200).await;
    Mock::given(method("GET"))
        .and(path("/funding.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&manifest_host)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&repo_host)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let id = repo.add(&manifest_url, ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(provenance_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    // Attestation fetch failures are provenance errors, not fetch errors.
    assert_eq!(summary.invalid, 1);
    let row = repo.get(id);
    assert_eq!(row.crawl_errors, 1);
    assert!(row.crawl_message.contains("does not vouch"));
    assert_eq!(hook.calls(), vec![(id, false, ManifestStatus::Active)]);
}

#[tokio::test]
async fn test_rate_limited_host_is_skipped_for_rest_of_run() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(429))
        .expect(1)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let first = repo.add(&format!("{}/a/funding.json", server.uri()), ManifestStatus::Active, 0);
    let second = repo.add(&format!("{}/b/funding.json", server.uri()), ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    // One worker keeps the two jobs in order.
    let settings = CrawlSettings {
        workers: 1,
        ..crawl_settings()
    };
    let (_stop_tx, stop_rx) = watch::channel(false);
    let summary = manager(settings, repo.clone(), hook.clone()).run(stop_rx).await;

    assert_eq!(summary.fetch_failed, 1);
    assert_eq!(summary.rate_limited, 1);
    assert_eq!(repo.get(first).crawl_errors, 1);
    assert_eq!(repo.get(second).crawl_errors, 0);
}

#[tokio::test]
async fn test_stop_before_run_processes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    repo.add(&format!("{}/funding.json", server.uri()), ManifestStatus::Active, 0);
    let hook = Arc::new(RecordingHook::default());

    let (_stop_tx, stop_rx) = watch::channel(true);
    let summary = manager(crawl_settings(), repo.clone(), hook.clone())
        .run(stop_rx)
        .await;

    assert_eq!(summary.processed(), 0);
    assert_eq!(repo.writes(), 0);
}

#[tokio::test]
async fn test_fetch_manifest_validates_without_storing() {
    let server = MockServer::start().await;
    let base = server.uri();
    Mock::given(method("GET"))
        .and(path("/funding.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(manifest_json(&base)))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/broken.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
        .mount(&server)
        .await;

    let repo = Arc::new(MemoryManifestRepository::new());
    let mgr = manager(crawl_settings(), repo.clone(), Arc::new(RecordingHook::default()));

    let url = Url::parse(&format!("{}/funding.json", base)).unwrap();
    let doc = mgr.fetch_manifest(&url).await.unwrap();
    assert_eq!(doc.manifest.projects[0].name, "Widget");

    let broken = Url::parse(&format!("{}/broken.json", base)).unwrap();
    let err = mgr.fetch_manifest(&broken).await.unwrap_err();
    assert!(matches!(err, CrawlError::Validation(_)));

    assert_eq!(repo.writes(), 0);
}
