#![allow(clippy::unwrap_used)]
// Typed resource endpoints against a wiremock server.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use iisadm_api::resources::{
    CopyMoveRequest, FileRef, Reference, UpdateAppPoolRequest, UpdateApplicationRequest,
};
use iisadm_api::{AuthMode, Error, IisClient, ResourceKind, RetryPolicy};

async fn setup() -> (MockServer, IisClient) {
    let server = MockServer::start().await;
    let client = IisClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        AuthMode::None,
    )
    .with_retry_policy(RetryPolicy::immediate(1));
    (server, client)
}

// ── Application pools ───────────────────────────────────────────────

#[tokio::test]
async fn test_find_pool_by_name_reports_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/webserver/application-pools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "app_pools": [{"id": "p0", "name": "DefaultAppPool", "status": "started"}]
        })))
        .mount(&server)
        .await;

    let found = client.find_app_pool_by_name("DefaultAppPool").await.unwrap();
    assert_eq!(found.status, "started");

    let err = client.find_app_pool_by_name("Missing").await.unwrap_err();
    assert!(
        matches!(err, Error::NotFound { kind: ResourceKind::AppPool, ref key } if key == "Missing"),
        "got: {err:?}"
    );
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_update_pool_sends_only_changed_fields() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/webserver/application-pools/p1"))
        .and(body_json(json!({"status": "stopped"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "p1", "name": "Pool1", "status": "stopped"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = UpdateAppPoolRequest {
        status: Some("stopped".into()),
        ..UpdateAppPoolRequest::default()
    };
    let pool = client.update_app_pool("p1", &update).await.unwrap();
    assert_eq!(pool.status, "stopped");
}

#[tokio::test]
async fn test_delete_pool() {
    let (server, client) = setup().await;

    Mock::given(method("DELETE"))
        .and(path("/api/webserver/application-pools/p1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client.delete_app_pool("p1").await.unwrap();
}

// ── Websites and applications ───────────────────────────────────────

#[tokio::test]
async fn test_list_websites_requests_all_fields() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/webserver/websites"))
        .and(query_param("fields", "*"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "websites": [{
                "id": "w1",
                "name": "Default Web Site",
                "status": "started",
                "physical_path": "%SystemDrive%\\inetpub\\wwwroot",
                "bindings": [{"protocol": "http", "ip_address": "*", "port": 80, "hostname": ""}],
                "application_pool": {"id": "p0", "name": "DefaultAppPool"}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let sites = client.list_websites().await.unwrap();
    assert_eq!(sites.len(), 1);
    assert_eq!(sites[0].bindings[0].port, 80);
    assert_eq!(
        sites[0].application_pool.as_ref().map(|p| p.id.as_str()),
        Some("p0")
    );
}

#[tokio::test]
async fn test_update_application() {
    let (server, client) = setup().await;

    Mock::given(method("PATCH"))
        .and(path("/api/webserver/webapps/a1"))
        .and(body_json(json!({"physical_path": "C:\\apps\\v2", "application_pool": {"id": "p2"}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "a1", "path": "/shop", "physical_path": "C:\\apps\\v2"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let update = UpdateApplicationRequest {
        physical_path: Some(r"C:\apps\v2".into()),
        application_pool: Some(Reference::id("p2")),
        ..UpdateApplicationRequest::default()
    };
    let app = client.update_application("a1", &update).await.unwrap();
    assert_eq!(app.path, "/shop");
}

// ── Files ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_find_file_walks_only_matching_directories() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("parent.id", "root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"id": "other", "name": "other", "type": "directory", "physical_path": "C:\\other"},
                {"id": "sites", "name": "sites", "type": "directory", "physical_path": "C:\\Sites"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("parent.id", "sites"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                {"id": "cfg", "name": "web.config", "type": "file", "physical_path": "C:\\Sites\\web.config"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("parent.id", "other"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .expect(0)
        .mount(&server)
        .await;

    let file = client
        .find_file_by_physical_path("c:/sites/WEB.CONFIG", Some("root"))
        .await
        .unwrap();
    assert_eq!(file.id, "cfg");
}

#[tokio::test]
async fn test_find_file_not_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/files"))
        .and(query_param("parent.id", "root"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"files": []})))
        .mount(&server)
        .await;

    let err = client
        .find_file_by_physical_path(r"C:\nope", Some("root"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound { kind: ResourceKind::File, .. }));
}

#[tokio::test]
async fn test_copy_and_move_bodies() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/files/copy"))
        .and(body_json(json!({"name": "b.txt", "file": {"id": "f1"}, "parent": {"id": "d2"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "f2", "name": "b.txt", "type": "file"
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/files/move"))
        .and(body_json(json!({"file": {"id": "f1"}, "parent": {"id": "d2"}})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "id": "f1", "name": "a.txt", "type": "file"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let copied = client
        .copy_file(&CopyMoveRequest {
            name: Some("b.txt".into()),
            file: FileRef::id("f1"),
            parent: FileRef::id("d2"),
        })
        .await
        .unwrap();
    assert_eq!(copied.id, "f2");

    let moved = client
        .move_file(&CopyMoveRequest {
            name: None,
            file: FileRef::id("f1"),
            parent: FileRef::id("d2"),
        })
        .await
        .unwrap();
    assert_eq!(moved.name, "a.txt");
}

#[tokio::test]
async fn test_webserver_files_filter_by_website() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/webserver/files"))
        .and(query_param("website.id", "w1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [{"id": "v1", "name": "index.html", "type": "file"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let files = client.list_webserver_files(Some("w1")).await.unwrap();
    assert_eq!(files[0].name, "index.html");
}

// ── Certificates ────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_certificates() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/certificates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "certificates": [{
                "id": "c1",
                "alias": "shop",
                "issued_by": "CN=Corp CA",
                "subject": "CN=shop.corp.local",
                "thumbprint": "ABCDEF"
            }]
        })))
        .mount(&server)
        .await;

    let certs = client.list_certificates().await.unwrap();
    assert_eq!(certs[0].thumbprint, "ABCDEF");
}
