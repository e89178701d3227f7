//! Service account detection and scoped-token URL resolution.
//!
//! Atlassian service accounts cannot use the site URL directly. Their API
//! tokens are scoped, so calls go through
//! `{scoped_base}/ex/jira/{cloudId}` where the cloud id comes from the
//! site's public tenant info endpoint.

use crate::error::{ClientError, ClientResult};
use crate::http;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Domain of Atlassian service account emails.
pub const SERVICE_ACCOUNT_DOMAIN: &str = "@serviceaccount.atlassian.com";

/// Default base URL for scoped-token calls.
pub const DEFAULT_SCOPED_API_BASE_URL: &str = "https://api.atlassian.com";

#[derive(Debug, Deserialize)]
struct TenantInfo {
    #[serde(rename = "cloudId", default)]
    cloud_id: Option<String>,
}

#[must_use]
pub fn is_service_account(email: &str) -> bool {
    email.ends_with(SERVICE_ACCOUNT_DOMAIN)
}

/// Looks up the cloud id of a Jira site.
pub async fn resolve_cloud_id(client: &Client, jira_url: &str) -> ClientResult<String> {
    if jira_url.is_empty() {
        return Err(ClientError::EmptyJiraUrl);
    }

    let url = format!("{}/_edge/tenant_info", jira_url.trim_end_matches('/'));
    debug!(%url, "Resolving cloud id");

    let info: TenantInfo = http::fetch("tenant info request", client.get(&url)).await?;
    match info.cloud_id {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(ClientError::MissingCloudId),
    }
}

/// Base URL API calls should use for `email` against `jira_url`.
///
/// Regular accounts use the site URL as given.
pub async fn resolve_url(
    client: &Client,
    email: &str,
    jira_url: &str,
    scoped_api_base_url: &str,
) -> ClientResult<String> {
    if email.is_empty() {
        return Err(ClientError::EmptyEmail);
    }
    if jira_url.is_empty() {
        return Err(ClientError::EmptyJiraUrl);
    }
    if !is_service_account(email) {
        return Ok(jira_url.to_string());
    }

    let cloud_id = resolve_cloud_id(client, jira_url)
        .await
        .map_err(|e| ClientError::CloudIdResolution(Box::new(e)))?;
    Ok(format!(
        "{}/ex/jira/{}",
        scoped_api_base_url.trim_end_matches('/'),
        cloud_id
    ))
}
