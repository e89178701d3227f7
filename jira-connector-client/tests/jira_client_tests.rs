use jira_connector_client::models::{IssueTypeRef, KeyRef, NewIssue, NewIssueFields};
use jira_connector_client::{ClientError, JiraClient, JiraConfig, MemorySessionStore, SessionStore};
use jira_connector_types::ErrorCode;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{basic_auth, body_json, body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(server: &MockServer) -> JiraConfig {
    JiraConfig {
        url: server.uri(),
        email: "admin@example.com".to_string(),
        api_token: "api-token".to_string(),
        scoped_api_base_url: server.uri(),
    }
}

fn client(server: &MockServer) -> (JiraClient, Arc<MemorySessionStore>) {
    let session = Arc::new(MemorySessionStore::new());
    let jira = JiraClient::new(config(server), session.clone()).unwrap();
    (jira, session)
}

fn project_json(id: &str, key: &str) -> serde_json::Value {
    json!({
        "id": id,
        "key": key,
        "name": format!("Project {key}"),
        "isPrivate": false,
        "roles": {
            "Administrators": format!("https://example.atlassian.net/rest/api/3/project/{id}/role/10002")
        }
    })
}

// ── Users ───────────────────────────────────────────────────────

#[tokio::test]
async fn find_users_sends_basic_auth_and_offsets() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/users/search"))
        .and(basic_auth("admin@example.com", "api-token"))
        .and(query_param("startAt", "50"))
        .and(query_param("maxResults", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"accountId": "u-1", "accountType": "atlassian", "displayName": "Ada Lovelace", "active": true},
            {"accountId": "u-2", "accountType": "app", "displayName": "Build Bot", "active": false}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let users = jira.find_users(50, 50).await.unwrap();
    assert_eq!(users.len(), 2);
    assert_eq!(users[0].account_id, "u-1");
    assert!(!users[1].active);
}

#[tokio::test]
async fn all_users_follows_pages_until_short() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/users/search"))
        .and(query_param("startAt", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"accountId": "u-1"}, {"accountId": "u-2"}
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/users/search"))
        .and(query_param("startAt", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"accountId": "u-3"}])))
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let users = jira.all_users(2).await.unwrap();
    let ids: Vec<_> = users.iter().map(|u| u.account_id.as_str()).collect();
    assert_eq!(ids, vec!["u-1", "u-2", "u-3"]);
}

#[tokio::test]
async fn create_user_posts_email_and_products() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/user"))
        .and(body_json(json!({
            "emailAddress": "new@example.com",
            "products": ["jira-software"]
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "accountId": "u-new",
            "emailAddress": "new@example.com",
            "active": true
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let user = jira
        .create_user("new@example.com", &["jira-software".to_string()])
        .await
        .unwrap();
    assert_eq!(user.account_id, "u-new");
}

// ── Groups ──────────────────────────────────────────────────────

#[tokio::test]
async fn add_user_to_group_accepts_created() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/group/user"))
        .and(query_param("groupId", "g-1"))
        .and(body_json(json!({"accountId": "u-1"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"name": "devs"})))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    jira.add_user_to_group("g-1", "u-1").await.unwrap();
}

#[tokio::test]
async fn add_user_to_group_rejects_other_success_codes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/group/user"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let err = jira.add_user_to_group("g-1", "u-1").await.unwrap_err();
    assert_eq!(err.status(), Some(200));
}

#[tokio::test]
async fn already_member_message_is_visible() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/group/user"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errorMessages": ["User is already a member of 'devs'."],
            "errors": {}
        })))
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let err = jira.add_user_to_group("g-1", "u-1").await.unwrap_err();
    assert!(err.message_contains("User is already a member of"));
    assert_eq!(err.code(), ErrorCode::Unknown);
}

#[tokio::test]
async fn remove_user_from_group_sends_both_ids() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/rest/api/3/group/user"))
        .and(query_param("groupId", "g-1"))
        .and(query_param("accountId", "u-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    jira.remove_user_from_group("g-1", "u-1").await.unwrap();
}

// ── Roles and projects ──────────────────────────────────────────

#[tokio::test]
async fn get_role_is_memoized_in_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/role/10002"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10002,
            "name": "Administrators",
            "description": "Admins",
            "actors": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, session) = client(&server);
    let first = jira.get_role(10002).await.unwrap();
    let second = jira.get_role(10002).await.unwrap();
    assert_eq!(first, second);
    assert!(session.get("role:10002").await.unwrap().is_some());
}

#[tokio::test]
async fn get_projects_reads_session_before_remote() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/project/10001"))
        .respond_with(ResponseTemplate::new(200).set_body_json(project_json("10001", "OPS")))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/project/search"))
        .and(query_param("expand", "issueTypes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [project_json("10000", "PLAT")],
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "isLast": true
        })))
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let page = jira.search_projects(0, 50, &["issueTypes"], &[]).await.unwrap();
    jira.set_projects(&page.values).await;

    let projects = jira
        .get_projects(&["10000".to_string(), "10001".to_string()])
        .await
        .unwrap();
    let keys: Vec<_> = projects.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["PLAT", "OPS"]);
    assert_eq!(projects[0].role_ids().unwrap(), vec![10002]);
}

#[tokio::test]
async fn project_role_actor_management() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/3/project/10000/role/10002"))
        .and(body_json(json!({"user": ["u-1"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": 10002, "name": "Administrators"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/rest/api/3/project/10000/role/10002"))
        .and(query_param("user", "u-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    jira.add_actor_to_project_role("10000", 10002, "u-1").await.unwrap();
    jira.remove_actor_from_project_role("10000", 10002, "u-1").await.unwrap();
}

// ── Issues ──────────────────────────────────────────────────────

#[tokio::test]
async fn create_issue_defaults_to_task_without_type() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/rest/api/2/issue"))
        .and(body_partial_json(json!({
            "fields": {"issuetype": {"name": "Task"}, "project": {"key": "PLAT"}}
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "10100", "key": "PLAT-1"})))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let created = jira
        .create_issue(NewIssue {
            fields: NewIssueFields {
                summary: "Access".into(),
                project: KeyRef { key: "PLAT".into() },
                issuetype: IssueTypeRef::default(),
                ..Default::default()
            },
        })
        .await
        .unwrap();
    assert_eq!(created.key, "PLAT-1");
}

#[tokio::test]
async fn statuses_search_filters_done_category() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/statuses/search"))
        .and(query_param("statusCategory", "DONE"))
        .and(query_param("projectId", "10000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "values": [{"id": "1", "name": "Done", "scope": {"type": "GLOBAL"}}],
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let page = jira.search_statuses("10000", 0, 200).await.unwrap();
    assert_eq!(page.values[0].name, "Done");
    assert_eq!(page.total, 1);
}

// ── Error classification ────────────────────────────────────────

#[tokio::test]
async fn http_statuses_map_to_codes() {
    let cases = [
        (401, ErrorCode::Unauthenticated),
        (403, ErrorCode::PermissionDenied),
        (404, ErrorCode::NotFound),
        (429, ErrorCode::Unavailable),
        (501, ErrorCode::Unimplemented),
        (503, ErrorCode::Unavailable),
        (500, ErrorCode::Unknown),
    ];

    for (status, expected) in cases {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rest/api/3/myself"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let (jira, _) = client(&server);
        let err = jira.myself().await.unwrap_err();
        assert_eq!(err.code(), expected, "status {status}");
        assert_eq!(err.is_unauthorized(), status == 401);
    }
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/api/3/role"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let (jira, _) = client(&server);
    let err = jira.list_roles().await.unwrap_err();
    assert!(matches!(err, ClientError::Decode { .. }));
    assert!(err.to_string().starts_with("failed to decode list roles"));
}

// ── Base URL resolution ─────────────────────────────────────────

#[tokio::test]
async fn service_account_switches_to_scoped_url() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/_edge/tenant_info"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"cloudId": "cloud-123"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/ex/jira/cloud-123/rest/api/3/myself"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"accountId": "bot"})))
        .expect(1)
        .mount(&server)
        .await;

    let config = JiraConfig {
        email: "bot@serviceaccount.atlassian.com".to_string(),
        ..config(&server)
    };
    let jira = JiraClient::connect(config, Arc::new(MemorySessionStore::new()))
        .await
        .unwrap();
    assert_eq!(jira.base_url().await, format!("{}/ex/jira/cloud-123", server.uri()));
    assert_eq!(jira.myself().await.unwrap().account_id, "bot");
}
