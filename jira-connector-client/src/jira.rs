//! Jira Cloud REST client.
//!
//! Authenticates with basic auth (`email:api_token`). The base URL sits behind
//! a lock so a service account can switch to its scoped-token URL after an
//! unauthorized response without rebuilding the client.

use crate::error::{ClientError, ClientResult};
use crate::http;
use crate::models::{
    AuditPage, AuditQuery, CreateMetaPage, CreatedIssue, GroupMember, GroupSummary, Issue,
    JiraStatus, NewIssue, Page, Project, Role, User,
};
use crate::service_account::{self, DEFAULT_SCOPED_API_BASE_URL};
use crate::session::SessionStore;
use reqwest::{Client, Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Status category used when searching for ticket statuses.
const DONE_STATUS_CATEGORY: &str = "DONE";

/// Jira connection settings.
#[derive(Clone)]
pub struct JiraConfig {
    /// Site URL, e.g. `https://example.atlassian.net`.
    pub url: String,
    pub email: String,
    pub api_token: String,
    /// Base URL for scoped-token calls made by service accounts.
    pub scoped_api_base_url: String,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            email: String::new(),
            api_token: String::new(),
            scoped_api_base_url: DEFAULT_SCOPED_API_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JiraConfig")
            .field("url", &self.url)
            .field("email", &self.email)
            .field("api_token", &"<redacted>")
            .field("scoped_api_base_url", &self.scoped_api_base_url)
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccountIdBody<'a> {
    account_id: &'a str,
}

#[derive(Serialize)]
struct RoleActorsBody<'a> {
    user: [&'a str; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewUserBody<'a> {
    email_address: &'a str,
    products: &'a [String],
}

/// Jira REST client with session-store backed lookups.
pub struct JiraClient {
    config: JiraConfig,
    client: Client,
    base_url: Arc<RwLock<String>>,
    session: Arc<dyn SessionStore>,
}

impl JiraClient {
    /// Creates a client that calls `config.url` as given.
    pub fn new(config: JiraConfig, session: Arc<dyn SessionStore>) -> ClientResult<Self> {
        if config.url.is_empty() {
            return Err(ClientError::EmptyJiraUrl);
        }
        let client = http::build_http_client()?;
        let base_url = Arc::new(RwLock::new(config.url.clone()));
        Ok(Self {
            config,
            client,
            base_url,
            session,
        })
    }

    /// Creates a client whose base URL is resolved for the configured
    /// account (scoped-token URL for service accounts).
    pub async fn connect(config: JiraConfig, session: Arc<dyn SessionStore>) -> ClientResult<Self> {
        let jira = Self::new(config, session)?;
        jira.resolve_base_url().await?;
        Ok(jira)
    }

    /// Base URL currently in use.
    pub async fn base_url(&self) -> String {
        self.base_url.read().await.clone()
    }

    /// Re-resolves the base URL from the configured site and account.
    pub async fn resolve_base_url(&self) -> ClientResult<String> {
        let resolved = service_account::resolve_url(
            &self.client,
            &self.config.email,
            &self.config.url,
            &self.config.scoped_api_base_url,
        )
        .await?;
        let mut base_url = self.base_url.write().await;
        if *base_url != resolved {
            info!(base_url = %resolved, "Switching Jira base URL");
        }
        *base_url = resolved.clone();
        Ok(resolved)
    }

    /// The site URL, used to build browse links.
    #[must_use]
    pub fn site_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let base = self.base_url.read().await;
        let url = format!("{}/{}", base.trim_end_matches('/'), path);
        self.client
            .request(method, url)
            .basic_auth(&self.config.email, Some(&self.config.api_token))
            .header("Accept", "application/json")
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        context: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> ClientResult<T> {
        let request = self.request(Method::GET, path).await.query(query);
        http::fetch(context, request).await
    }

    // ---- Users ----

    /// One page of users, including inactive and non-human accounts.
    pub async fn find_users(&self, start_at: u64, max_results: u64) -> ClientResult<Vec<User>> {
        debug!(start_at, max_results, "Listing users");
        self.get_json(
            "list users",
            "rest/api/3/users/search",
            &[
                ("startAt", start_at.to_string()),
                ("maxResults", max_results.to_string()),
            ],
        )
        .await
    }

    /// Every user in the site, following pages until a short one.
    pub async fn all_users(&self, page_size: u64) -> ClientResult<Vec<User>> {
        let mut users = Vec::new();
        let mut start_at = 0;
        loop {
            let page = self.find_users(start_at, page_size).await?;
            let count = page.len() as u64;
            users.extend(page);
            if count < page_size {
                return Ok(users);
            }
            start_at += count;
        }
    }

    pub async fn myself(&self) -> ClientResult<User> {
        self.get_json("get current user", "rest/api/3/myself", &[]).await
    }

    /// Invites a user to the site with access to `products`.
    pub async fn create_user(&self, email: &str, products: &[String]) -> ClientResult<User> {
        let request = self
            .request(Method::POST, "rest/api/3/user")
            .await
            .json(&NewUserBody {
                email_address: email,
                products,
            });
        http::fetch("create user", request).await
    }

    // ---- Groups ----

    pub async fn bulk_groups(&self, start_at: u64, max_results: u64) -> ClientResult<Page<GroupSummary>> {
        self.get_json(
            "list groups",
            "rest/api/3/group/bulk",
            &[
                ("startAt", start_at.to_string()),
                ("maxResults", max_results.to_string()),
            ],
        )
        .await
    }

    pub async fn group_members(
        &self,
        group_id: &str,
        start_at: u64,
        max_results: u64,
    ) -> ClientResult<Page<GroupMember>> {
        self.get_json(
            "list group members",
            "rest/api/3/group/member",
            &[
                ("groupId", group_id.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", max_results.to_string()),
            ],
        )
        .await
    }

    /// Adds a user to a group. Jira answers 201 on success.
    pub async fn add_user_to_group(&self, group_id: &str, account_id: &str) -> ClientResult<()> {
        let context = "add user to group";
        let request = self
            .request(Method::POST, "rest/api/3/group/user")
            .await
            .query(&[("groupId", group_id)])
            .json(&AccountIdBody { account_id });
        let response = http::send(context, request).await?;
        let status = response.status().as_u16();
        if status != 201 {
            let message = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                context: context.to_string(),
                status,
                message,
            });
        }
        Ok(())
    }

    pub async fn remove_user_from_group(&self, group_id: &str, account_id: &str) -> ClientResult<()> {
        let request = self
            .request(Method::DELETE, "rest/api/3/group/user")
            .await
            .query(&[("groupId", group_id), ("accountId", account_id)]);
        http::send("remove user from group", request).await?;
        Ok(())
    }

    // ---- Roles ----

    pub async fn list_roles(&self) -> ClientResult<Vec<Role>> {
        self.get_json("list roles", "rest/api/3/role", &[]).await
    }

    /// Fetches a role, memoized in the session store under `role:{id}`.
    pub async fn get_role(&self, role_id: u64) -> ClientResult<Role> {
        let key = role_key(role_id);
        if let Some(role) = self.cached::<Role>(&key).await {
            return Ok(role);
        }

        let role: Role = self
            .get_json("get role", &format!("rest/api/3/role/{role_id}"), &[])
            .await?;
        self.store(&key, &role).await;
        Ok(role)
    }

    /// A role with its actors scoped to one project.
    pub async fn role_actors_for_project(&self, project_id: &str, role_id: u64) -> ClientResult<Role> {
        self.get_json(
            "get project role actors",
            &project_role_path(project_id, role_id),
            &[],
        )
        .await
    }

    pub async fn add_actor_to_project_role(
        &self,
        project_id: &str,
        role_id: u64,
        account_id: &str,
    ) -> ClientResult<()> {
        let request = self
            .request(Method::POST, &project_role_path(project_id, role_id))
            .await
            .json(&RoleActorsBody { user: [account_id] });
        http::send("add actor to project role", request).await?;
        Ok(())
    }

    pub async fn remove_actor_from_project_role(
        &self,
        project_id: &str,
        role_id: u64,
        account_id: &str,
    ) -> ClientResult<()> {
        let request = self
            .request(Method::DELETE, &project_role_path(project_id, role_id))
            .await
            .query(&[("user", account_id)]);
        http::send("remove actor from project role", request).await?;
        Ok(())
    }

    // ---- Projects ----

    /// One page of projects. `keys` restricts the search when non-empty.
    pub async fn search_projects(
        &self,
        start_at: u64,
        max_results: u64,
        expand: &[&str],
        keys: &[String],
    ) -> ClientResult<Page<Project>> {
        let mut query = vec![
            ("startAt", start_at.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        if !expand.is_empty() {
            query.push(("expand", expand.join(",")));
        }
        query.extend(keys.iter().map(|k| ("keys", k.clone())));
        self.get_json("search projects", "rest/api/3/project/search", &query)
            .await
    }

    /// Fetches a project by id or key, memoized in the session store.
    pub async fn get_project(&self, id_or_key: &str) -> ClientResult<Project> {
        if let Some(project) = self.cached::<Project>(id_or_key).await {
            return Ok(project);
        }

        let project: Project = self
            .get_json(
                "get project",
                &format!("rest/api/3/project/{}", urlencoding::encode(id_or_key)),
                &[],
            )
            .await?;
        self.store(&project.id, &project).await;
        Ok(project)
    }

    /// Fetches several projects, reading the session store first and only
    /// calling Jira for the ids it does not hold.
    pub async fn get_projects(&self, ids: &[String]) -> ClientResult<Vec<Project>> {
        let cached = match self.session.get_many(ids).await {
            Ok(found) => found,
            Err(e) => {
                warn!(error = %e, "Session store read failed");
                HashMap::new()
            }
        };

        let mut projects = Vec::with_capacity(ids.len());
        for id in ids {
            let hit = cached
                .get(id)
                .and_then(|bytes| serde_json::from_slice::<Project>(bytes).ok());
            match hit {
                Some(project) => projects.push(project),
                None => projects.push(self.get_project(id).await?),
            }
        }
        Ok(projects)
    }

    /// Writes projects to the session store, keyed by project id.
    pub async fn set_projects(&self, projects: &[Project]) {
        let mut values = HashMap::with_capacity(projects.len());
        for project in projects {
            match serde_json::to_vec(project) {
                Ok(bytes) => {
                    values.insert(project.id.clone(), bytes);
                }
                Err(e) => warn!(project_id = %project.id, error = %e, "Failed to encode project"),
            }
        }
        if let Err(e) = self.session.set_many(values).await {
            warn!(error = %e, "Session store write failed");
        }
    }

    // ---- Issues ----

    /// One page of creation metadata for a project and issue type.
    pub async fn create_meta_issue_type(
        &self,
        project_id_or_key: &str,
        issue_type_id: &str,
        start_at: u64,
        max_results: u64,
    ) -> ClientResult<CreateMetaPage> {
        self.get_json(
            "get issue create metadata",
            &format!(
                "rest/api/3/issue/createmeta/{}/issuetypes/{}",
                urlencoding::encode(project_id_or_key),
                urlencoding::encode(issue_type_id)
            ),
            &[
                ("startAt", start_at.to_string()),
                ("maxResults", max_results.to_string()),
            ],
        )
        .await
    }

    /// One page of "done" statuses usable in `project_id`.
    pub async fn search_statuses(
        &self,
        project_id: &str,
        start_at: u64,
        max_results: u64,
    ) -> ClientResult<Page<JiraStatus>> {
        self.get_json(
            "search statuses",
            "rest/api/3/statuses/search",
            &[
                ("statusCategory", DONE_STATUS_CATEGORY.to_string()),
                ("projectId", project_id.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", max_results.to_string()),
            ],
        )
        .await
    }

    pub async fn get_issue(&self, id_or_key: &str) -> ClientResult<Issue> {
        self.get_json(
            "get issue",
            &format!("rest/api/2/issue/{}", urlencoding::encode(id_or_key)),
            &[],
        )
        .await
    }

    /// Creates an issue. An issue type with neither id nor name falls back
    /// to "Task".
    pub async fn create_issue(&self, mut issue: NewIssue) -> ClientResult<CreatedIssue> {
        let issue_type = &mut issue.fields.issuetype;
        if issue_type.id.is_none() && issue_type.name.is_none() {
            issue_type.name = Some("Task".to_string());
        }
        let request = self
            .request(Method::POST, "rest/api/2/issue")
            .await
            .json(&issue);
        http::fetch("create issue", request).await
    }

    // ---- Audit log ----

    pub async fn audit_records(&self, query: &AuditQuery) -> ClientResult<AuditPage> {
        let mut params = vec![
            ("offset", query.offset.to_string()),
            ("limit", query.limit.to_string()),
            ("filter", query.filter.clone()),
        ];
        if let Some(from) = query.from {
            params.push(("from", from.to_rfc3339()));
        }
        self.get_json("list audit records", "rest/api/3/auditing/record", &params)
            .await
    }

    // ---- Session store ----

    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.session.get(key).await {
            Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!(key, error = %e, "Discarding undecodable session entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(key, error = %e, "Session store read failed");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        let bytes = match serde_json::to_vec(value) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(key, error = %e, "Failed to encode session entry");
                return;
            }
        };
        if let Err(e) = self.session.set(key, bytes).await {
            warn!(key, error = %e, "Session store write failed");
        }
    }
}

fn role_key(role_id: u64) -> String {
    format!("role:{role_id}")
}

fn project_role_path(project_id: &str, role_id: u64) -> String {
    format!(
        "rest/api/3/project/{}/role/{role_id}",
        urlencoding::encode(project_id)
    )
}
