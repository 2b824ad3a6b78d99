#![allow(clippy::unwrap_used)]
// Create-or-adopt behavior through the typed resource endpoints.

use std::sync::atomic::{AtomicUsize, Ordering};

use reqwest::{Method, StatusCode};
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use iisadm_api::resources::{ApplicationPool, FileRef, FileType};
use iisadm_api::{
    AuthMode, Error, ErrorKind, IisClient, NamedResource, ResourceKind, RetryPolicy,
    create_or_adopt,
};

const POOLS: &str = "/api/webserver/application-pools";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, IisClient) {
    let server = MockServer::start().await;
    let client = IisClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        AuthMode::None,
    )
    .with_retry_policy(RetryPolicy::immediate(2));
    (server, client)
}

fn conflict() -> Error {
    Error::Api {
        method: Method::POST,
        url: "http://iis.local/api/webserver/application-pools".into(),
        status: StatusCode::CONFLICT,
        body: "exists".into(),
        attempts: 1,
    }
}

fn pool(id: &str, name: &str) -> ApplicationPool {
    serde_json::from_value(json!({"id": id, "name": name})).unwrap()
}

// ── Application pools ───────────────────────────────────────────────

#[tokio::test]
async fn test_create_returns_new_pool() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .and(body_json(json!({"name": "Pool1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p1", "name": "Pool1"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let created = client.create_app_pool("Pool1", None).await.unwrap();
    assert_eq!(created.id, "p1");
}

#[tokio::test]
async fn test_conflict_adopts_existing_pool() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "app_pools": [
                {"id": "p0", "name": "DefaultAppPool"},
                {"id": "p1", "name": "Pool1"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let adopted = client.create_app_pool("Pool1", Some("v4.0")).await.unwrap();
    assert_eq!(adopted.id, "p1");
    assert_eq!(adopted.remote_id(), "p1");
    assert_eq!(adopted.natural_key(), "Pool1");
}

#[tokio::test]
async fn test_conflict_without_match_returns_original_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "app_pools": [{"id": "p2", "name": "pool1"}]
        })))
        .mount(&server)
        .await;

    let err = client.create_app_pool("Pool1", None).await.unwrap_err();
    assert!(err.is_conflict(), "got: {err:?}");
    assert_eq!(err.response_body(), Some("already exists"));
}

#[tokio::test]
async fn test_failed_lookup_returns_original_conflict() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let err = client.create_app_pool("Pool1", None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
}

#[tokio::test]
async fn test_other_errors_skip_lookup() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad runtime"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.create_app_pool("Pool1", Some("v9")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Invalid);
}

#[tokio::test]
async fn test_repeated_creates_resolve_to_same_pool() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p1", "name": "Pool1"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(POOLS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "app_pools": [{"id": "p1", "name": "Pool1"}]
        })))
        .mount(&server)
        .await;

    let first = client.create_app_pool("Pool1", None).await.unwrap();
    let second = client.create_app_pool("Pool1", None).await.unwrap();
    assert_eq!(first.id, second.id);
}

// ── Websites ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_website_conflict_adopts_by_name() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/webserver/websites"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/webserver/websites"))
        .and(query_param("fields", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "websites": [{"id": "w1", "name": "Shop", "physical_path": "C:\\sites\\shop"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = iisadm_api::resources::CreateWebsiteRequest {
        name: "Shop".into(),
        physical_path: r"C:\sites\shop".into(),
        bindings: vec![],
        application_pool: None,
    };
    let site = client.create_website(&request).await.unwrap();
    assert_eq!(site.id, "w1");
}

// ── Files ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_directory_conflict_adopts_by_normalized_path() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/files"))
        .and(body_json(json!({"name": "Logs", "parent": {"id": "d1"}, "type": "directory"})))
        .respond_with(ResponseTemplate::new(409))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("parent.id", "d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"id": "f1", "name": "web.config", "type": "file", "physical_path": "C:\\Sites\\web.config"},
                {"id": "f9", "name": "logs", "type": "directory", "physical_path": "c:/sites/logs/"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let parent = FileRef {
        physical_path: r"C:\Sites".into(),
        ..FileRef::id("d1")
    };
    let dir = client.create_directory("Logs", Some(&parent)).await.unwrap();
    assert_eq!(dir.id, "f9");
    assert_eq!(dir.file_type, FileType::Directory);
}

#[tokio::test]
async fn test_parent_path_is_fetched_after_conflict() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/files/d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "d1", "name": "Sites", "type": "directory", "physical_path": "C:\\Sites"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("parent.id", "d1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "f2", "name": "a.txt", "type": "file", "physical_path": "C:\\Sites\\A.TXT"}]
        })))
        .mount(&server)
        .await;

    let file = client
        .create_file("a.txt", Some(&FileRef::id("d1")), FileType::File)
        .await
        .unwrap();
    assert_eq!(file.id, "f2");
}

#[tokio::test]
async fn test_file_without_parent_is_never_adopted() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .create_file("orphan", None, FileType::File)
        .await
        .unwrap_err();
    assert!(err.is_conflict());
}

#[tokio::test]
async fn test_unknown_parent_path_is_not_fetched_before_create() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/files/par"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/files"))
        .and(body_json(json!({"name": "logs", "parent": {"id": "par"}, "type": "directory"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "d9", "name": "logs", "type": "directory"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = client
        .create_directory("logs", Some(&FileRef::id("par")))
        .await
        .unwrap();
    assert_eq!(dir.id, "d9");
}

#[tokio::test]
async fn test_unresolvable_parent_returns_original_conflict() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(409).set_body_string("already exists"))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files/par"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .expect(0)
        .mount(&server)
        .await;

    let err = client
        .create_directory("logs", Some(&FileRef::id("par")))
        .await
        .unwrap_err();
    assert!(err.is_conflict(), "got: {err:?}");
    assert_eq!(err.response_body(), Some("already exists"));
}

// ── Generic reconciler ──────────────────────────────────────────────

#[tokio::test]
async fn test_lookup_runs_only_after_conflict() {
    let lookups = AtomicUsize::new(0);

    let created = create_or_adopt(
        ResourceKind::AppPool,
        "Pool1",
        || async { Ok(pool("p1", "Pool1")) },
        || async {
            lookups.fetch_add(1, Ordering::SeqCst);
            Ok(vec![])
        },
    )
    .await
    .unwrap();
    assert_eq!(created.id, "p1");
    assert_eq!(lookups.load(Ordering::SeqCst), 0);

    let adopted = create_or_adopt(
        ResourceKind::AppPool,
        "Pool1",
        || async { Err(conflict()) },
        || async {
            lookups.fetch_add(1, Ordering::SeqCst);
            Ok(vec![pool("p7", "Pool1"), pool("p8", "Pool1")])
        },
    )
    .await
    .unwrap();
    assert_eq!(adopted.id, "p7");
    assert_eq!(lookups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cancellation_is_not_treated_as_conflict() {
    let result: Result<ApplicationPool, Error> = create_or_adopt(
        ResourceKind::AppPool,
        "Pool1",
        || async {
            Err(Error::Cancelled {
                method: Method::POST,
                url: POOLS.into(),
            })
        },
        || async { Ok(vec![pool("p1", "Pool1")]) },
    )
    .await;
    assert!(result.unwrap_err().is_cancelled());
}
