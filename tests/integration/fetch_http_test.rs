//! Network fetch behaviour against a local HTTP server: retry on transient
//! failures, no retry on permanent ones, checksum enforcement, and
//! marketplaces served from an index URL.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use skillmart::services::plugins::fetcher::{FetchRequest, Fetcher};
use skillmart::services::plugins::marketplace::MarketplaceService;
use skillmart::InstallLayout;

use crate::support::{fast_config, open_manager, sha256_hex, tar_gz, write_plugin};

fn fetcher(root: &std::path::Path) -> Fetcher {
    Fetcher::new(&InstallLayout::new(root), &fast_config().fetch).unwrap()
}

fn bundle(name: &str, version: &str) -> Vec<u8> {
    let src = tempfile::tempdir().unwrap();
    write_plugin(src.path(), name, version, &[("main", "Main skill of the bundle")]);
    tar_gz(src.path(), &format!("{}-{}", name, version))
}

async fn requests_to(server: &MockServer, route: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == route)
        .count()
}

#[tokio::test]
async fn transient_errors_are_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let body = fetcher(root.path())
        .fetch_bytes(&format!("{}/index.json", server.uri()))
        .await
        .unwrap();
    assert_eq!(body, b"{}");
    assert_eq!(requests_to(&server, "/index.json").await, 3);
}

#[tokio::test]
async fn retries_stop_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/index.json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let err = fetcher(root.path())
        .fetch_bytes(&format!("{}/index.json", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "NetworkError");
    assert_eq!(requests_to(&server, "/index.json").await, 3);
}

#[tokio::test]
async fn not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.tar.gz"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let err = fetcher(root.path())
        .fetch(&FetchRequest::new(format!("{}/missing.tar.gz", server.uri())))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "NotFound");
    assert_eq!(requests_to(&server, "/missing.tar.gz").await, 1);
}

#[tokio::test]
async fn slow_responses_time_out_as_network_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/slow.json"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let mut config = fast_config();
    config.fetch.timeout_secs = 1;
    config.fetch.max_attempts = 1;
    let fetcher = Fetcher::new(&InstallLayout::new(root.path()), &config.fetch).unwrap();

    let err = fetcher
        .fetch_bytes(&format!("{}/slow.json", server.uri()))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn archive_with_wrong_checksum_is_rejected() {
    let server = MockServer::start().await;
    let archive = bundle("ui-polish", "1.0.0");
    Mock::given(method("GET"))
        .and(path("/ui-polish.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive.clone()))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let fetcher = fetcher(root.path());
    let mut request = FetchRequest::new(format!("{}/ui-polish.tar.gz", server.uri()));
    request.plugin = Some("ui-polish".to_string());

    request.sha256 = Some("0".repeat(64));
    let err = fetcher.fetch(&request).await.unwrap_err();
    assert_eq!(err.kind(), "IntegrityMismatch");
    assert!(err.to_string().contains("ui-polish"));

    request.sha256 = Some(sha256_hex(&archive));
    let staged = fetcher.fetch(&request).await.unwrap();
    assert_eq!(staged.manifest.version, "1.0.0");
}

#[tokio::test]
async fn marketplace_from_index_url_installs_relative_archives() {
    let server = MockServer::start().await;
    let archive = bundle("ui-polish", "1.2.0");
    let index = format!(
        r#"{{"name": "remote", "plugins": [{{"name": "ui-polish", "source": "bundles/ui-polish.tar.gz", "sha256": "{}"}}]}}"#,
        sha256_hex(&archive)
    );
    Mock::given(method("GET"))
        .and(path("/market/index.json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(index))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/market/bundles/ui-polish.tar.gz"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(archive))
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let manager = open_manager(root.path());
    let (config, _) = manager
        .marketplaces()
        .add(&format!("{}/market/index.json", server.uri()), None)
        .await
        .unwrap();
    assert_eq!(config.name, "remote");

    let results = manager.install(&["ui-polish@remote".to_string()], false).await;
    let outcome = results[0].1.as_ref().unwrap();
    assert_eq!(outcome.record.installed_version, "1.2.0");
    assert_eq!(outcome.record.marketplace.as_deref(), Some("remote"));
    assert!(outcome.record.source.ends_with("/market/bundles/ui-polish.tar.gz"));
}

#[tokio::test]
async fn github_marketplace_falls_back_to_master() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acme/skills/master/.claude-plugin/marketplace.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"name": "acme", "plugins": [{"name": "lint", "source": "./lint"}]}"#),
        )
        .mount(&server)
        .await;

    let root = tempfile::tempdir().unwrap();
    let layout = InstallLayout::new(root.path());
    let service = MarketplaceService::new(&layout, fetcher(root.path())).with_github_raw_base(server.uri());

    let (config, index) = service.add("acme/skills", None).await.unwrap();
    assert_eq!(config.name, "acme");
    assert!(index.get("lint").is_some());
    // main: three 404s, then master's first candidate
    assert_eq!(server.received_requests().await.unwrap_or_default().len(), 4);
}
