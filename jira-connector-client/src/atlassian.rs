//! Atlassian Admin API client.
//!
//! Lists organization users and groups per site. Users and groups page with
//! a `cursor` query parameter; the workspaces endpoint takes its cursor in
//! the JSON body and rejects any other field alongside it, so no `limit` is
//! sent there.

use crate::error::{ClientError, ClientResult};
use crate::http;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Largest page the Admin API serves.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Default Admin API base URL.
pub const DEFAULT_ADMIN_API_BASE_URL: &str = "https://api.atlassian.com";

/// Clamps a requested page size into what the Admin API accepts.
#[must_use]
pub fn clamp_page_size(requested: i64) -> i64 {
    requested.clamp(0, MAX_PAGE_SIZE)
}

/// Admin API settings.
#[derive(Clone)]
pub struct AtlassianConfig {
    pub organization_id: String,
    pub access_token: String,
    pub base_url: String,
}

impl AtlassianConfig {
    pub fn new(organization_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            access_token: access_token.into(),
            base_url: DEFAULT_ADMIN_API_BASE_URL.to_string(),
        }
    }
}

impl fmt::Debug for AtlassianConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AtlassianConfig")
            .field("organization_id", &self.organization_id)
            .field("access_token", &"<redacted>")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    data: Vec<T>,
    #[serde(default)]
    links: Links,
}

impl<T> ListResponse<T> {
    fn into_page(self) -> (Vec<T>, String) {
        (self.data, self.links.next.unwrap_or_default())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorItem {
    #[serde(default)]
    detail: String,
}

/// Error body returned by the Admin API.
#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

impl ApiError {
    fn message(&self) -> String {
        match self.errors.first() {
            Some(first) => format!("API error response detail: {}", first.detail),
            None => "Error response empty".to_string(),
        }
    }
}

/// Organization user as seen by the Admin API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminUser {
    pub account_id: String,
    #[serde(default)]
    pub account_type: String,
    #[serde(default)]
    pub account_status: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub email_verified: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminGroup {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub directory_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceAttributes {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub host_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workspace {
    pub id: String,
    #[serde(default)]
    pub attributes: WorkspaceAttributes,
}

#[derive(Serialize)]
struct WorkspaceQuery<'a> {
    #[serde(skip_serializing_if = "str::is_empty")]
    cursor: &'a str,
}

/// Bearer-token client for the Atlassian Admin API.
pub struct AtlassianClient {
    config: AtlassianConfig,
    client: Client,
}

impl AtlassianClient {
    pub fn new(config: AtlassianConfig) -> ClientResult<Self> {
        if config.organization_id.is_empty() {
            return Err(ClientError::Config("organization id is required".to_string()));
        }
        Ok(Self {
            config,
            client: http::build_http_client()?,
        })
    }

    fn org_url(&self, path: &str) -> String {
        format!(
            "{}/admin/v2/orgs/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.organization_id),
            path
        )
    }

    async fn list<T: DeserializeOwned>(
        &self,
        context: &str,
        request: RequestBuilder,
    ) -> ClientResult<(Vec<T>, String)> {
        let response = request
            .bearer_auth(&self.config.access_token)
            .send()
            .await
            .map_err(|e| ClientError::from_reqwest(context, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .unwrap_or_default()
                .message();
            return Err(ClientError::Status {
                context: context.to_string(),
                status: status.as_u16(),
                message,
            });
        }

        let page: ListResponse<T> = http::decode(context, response).await?;
        Ok(page.into_page())
    }

    fn directory_request(&self, path: &str, site_id: &str, cursor: &str) -> RequestBuilder {
        let mut query = vec![
            ("resourceIds", site_id.to_string()),
            ("limit", clamp_page_size(MAX_PAGE_SIZE).to_string()),
        ];
        if !cursor.is_empty() {
            query.push(("cursor", cursor.to_string()));
        }
        self.client.get(self.org_url(path)).query(&query)
    }

    /// One page of users with access to `site_id`, plus the next cursor
    /// (empty on the last page).
    pub async fn list_users(&self, site_id: &str, cursor: &str) -> ClientResult<(Vec<AdminUser>, String)> {
        debug!(site_id, "Listing organization users");
        let request = self.directory_request("directories/-/users", site_id, cursor);
        self.list("list organization users", request).await
    }

    pub async fn list_groups(&self, site_id: &str, cursor: &str) -> ClientResult<(Vec<AdminGroup>, String)> {
        debug!(site_id, "Listing organization groups");
        let request = self.directory_request("directories/-/groups", site_id, cursor);
        self.list("list organization groups", request).await
    }

    pub async fn list_workspaces(&self, cursor: &str) -> ClientResult<(Vec<Workspace>, String)> {
        let request = self
            .client
            .post(self.org_url("workspaces"))
            .json(&WorkspaceQuery { cursor });
        self.list("list workspaces", request).await
    }

    /// Ids of every workspace hosted at `site_url`.
    pub async fn site_ids(&self, site_url: &str) -> ClientResult<Vec<String>> {
        let wanted = site_url.trim_end_matches('/');
        let mut site_ids = Vec::new();
        let mut cursor = String::new();
        loop {
            let (workspaces, next) = self.list_workspaces(&cursor).await?;
            site_ids.extend(
                workspaces
                    .into_iter()
                    .filter(|w| w.attributes.host_url.trim_end_matches('/') == wanted)
                    .map(|w| w.id),
            );
            if next.is_empty() {
                break;
            }
            cursor = next;
        }

        if site_ids.is_empty() {
            return Err(ClientError::SiteIdNotFound);
        }
        Ok(site_ids)
    }
}
