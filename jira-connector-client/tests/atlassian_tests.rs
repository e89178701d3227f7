use jira_connector_client::{AtlassianClient, AtlassianConfig, ClientError};
use jira_connector_types::ErrorCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{bearer_token, body_json, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer) -> AtlassianClient {
    let config = AtlassianConfig {
        base_url: server.uri(),
        ..AtlassianConfig::new("org-1", "admin-token")
    };
    AtlassianClient::new(config).unwrap()
}

#[test]
fn config_debug_redacts_token() {
    let rendered = format!("{:?}", AtlassianConfig::new("org-1", "admin-token"));
    assert!(!rendered.contains("admin-token"));
}

// ── Users and groups ────────────────────────────────────────────

#[tokio::test]
async fn list_users_relays_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/v2/orgs/org-1/directories/-/users"))
        .and(bearer_token("admin-token"))
        .and(query_param("resourceIds", "site-1"))
        .and(query_param("limit", "100"))
        .and(query_param_is_missing("cursor"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "accountId": "u-1",
                "accountType": "atlassian",
                "status": "active",
                "name": "ada",
                "email": "ada@example.com",
                "emailVerified": true
            }],
            "links": {"next": "cursor-2"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/admin/v2/orgs/org-1/directories/-/users"))
        .and(query_param("cursor", "cursor-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "links": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let admin = client(&server);
    let (users, next) = admin.list_users("site-1", "").await.unwrap();
    assert_eq!(users[0].email, "ada@example.com");
    assert!(users[0].email_verified);
    assert_eq!(next, "cursor-2");

    let (users, next) = admin.list_users("site-1", &next).await.unwrap();
    assert!(users.is_empty());
    assert_eq!(next, "");
}

#[tokio::test]
async fn list_groups_returns_groups() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/v2/orgs/org-1/directories/-/groups"))
        .and(query_param("resourceIds", "site-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "g-1", "name": "devs", "description": "Developers"}],
            "links": {"next": null}
        })))
        .mount(&server)
        .await;

    let (groups, next) = client(&server).list_groups("site-1", "").await.unwrap();
    assert_eq!(groups[0].name, "devs");
    assert_eq!(next, "");
}

// ── Workspaces ──────────────────────────────────────────────────

#[tokio::test]
async fn site_ids_walks_workspace_pages() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/v2/orgs/org-1/workspaces"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {"id": "site-1", "attributes": {"hostUrl": "https://example.atlassian.net"}},
                {"id": "site-x", "attributes": {"hostUrl": "https://other.atlassian.net"}}
            ],
            "links": {"next": "page-2"}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/admin/v2/orgs/org-1/workspaces"))
        .and(body_json(json!({"cursor": "page-2"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": "site-2", "attributes": {"hostUrl": "https://example.atlassian.net/"}}],
            "links": {}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let ids = client(&server)
        .site_ids("https://example.atlassian.net")
        .await
        .unwrap();
    assert_eq!(ids, vec!["site-1".to_string(), "site-2".to_string()]);
}

#[tokio::test]
async fn unknown_site_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/admin/v2/orgs/org-1/workspaces"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [], "links": {}})))
        .mount(&server)
        .await;

    let err = client(&server)
        .site_ids("https://example.atlassian.net")
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::SiteIdNotFound));
    assert_eq!(err.to_string(), "site id not found");
}

// ── Errors ──────────────────────────────────────────────────────

#[tokio::test]
async fn api_error_detail_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/v2/orgs/org-1/directories/-/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "errors": [{"id": "e1", "status": "403", "detail": "token lacks scope"}]
        })))
        .mount(&server)
        .await;

    let err = client(&server).list_users("site-1", "").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::PermissionDenied);
    assert!(err.to_string().contains("API error response detail: token lacks scope"));
}

#[tokio::test]
async fn empty_error_body_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/admin/v2/orgs/org-1/directories/-/groups"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client(&server).list_groups("site-1", "").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Unavailable);
    assert!(err.to_string().contains("Error response empty"));
}
