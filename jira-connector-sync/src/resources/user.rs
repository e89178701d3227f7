//! Users: listed from Jira (offset mode) or, when the Admin API is
//! configured, per site from the organization directory (cursor relay).

use super::{AdminDirectory, ListPage, PAGE_SIZE, ResourceSyncer, USER, profile, site_frame};
use crate::error::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use jira_connector_client::models::User;
use jira_connector_client::{AdminUser, JiraClient};
use jira_connector_types::pagination::{next_offset_cursor, offset_cursor, relay_cursor};
use jira_connector_types::{
    AccountType, Entitlement, Grant, PageFrame, Profile, Resource, ResourceId,
    ResourceType, UserStatus, UserTrait,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::debug;

const CUSTOMER_ACCOUNT: &str = "customer";

/// Maps a Jira user into a user resource.
pub fn user_resource(user: &User) -> Resource {
    let mut names = user.display_name.split(' ');
    let mut profile = profile([
        ("login", json!(user.email_address)),
        ("first_name", json!(names.next().unwrap_or_default())),
        ("user_id", json!(user.account_id)),
    ]);
    if let Some(last_name) = names.next() {
        profile.insert("last_name".to_string(), Value::from(last_name));
    }

    let status = if user.active {
        UserStatus::Enabled
    } else {
        UserStatus::Disabled
    };

    let mut user_trait = UserTrait {
        profile,
        ..Default::default()
    }
    .with_status(status)
    .with_account_type(account_type(&user.account_type));
    if !user.email_address.is_empty() {
        user_trait = user_trait.with_email(&user.email_address, true);
    }

    Resource::user(&USER, &user.account_id, &user.display_name, user_trait)
}

fn account_type(raw: &str) -> AccountType {
    match raw {
        "atlassian" | CUSTOMER_ACCOUNT => AccountType::Human,
        "app" => AccountType::Service,
        _ => AccountType::Unspecified,
    }
}

/// Maps an organization directory user into a user resource.
fn admin_user_resource(user: &AdminUser) -> Resource {
    let profile = profile([
        ("account_id", json!(user.account_id)),
        ("account_type", json!(user.account_type)),
        ("username", json!(user.name)),
        ("email_verified", json!(user.email_verified)),
    ]);

    let status = match user.status.as_str() {
        "active" => UserStatus::Enabled,
        "deactivated" => UserStatus::Disabled,
        _ => UserStatus::Unspecified,
    };

    let user_trait = UserTrait {
        profile,
        ..Default::default()
    }
    .with_status(status)
    .with_login(&user.email)
    .with_email(&user.email, true);

    Resource::user(&USER, &user.account_id, &user.email, user_trait)
}

pub struct UserSyncer {
    jira: Arc<JiraClient>,
    directory: Option<AdminDirectory>,
    skip_customer_users: bool,
}

impl UserSyncer {
    pub fn new(jira: Arc<JiraClient>, directory: Option<AdminDirectory>, skip_customer_users: bool) -> Self {
        Self {
            jira,
            directory,
            skip_customer_users,
        }
    }

    async fn list_jira_users(&self, token: &str) -> ConnectorResult<ListPage<Resource>> {
        let (stack, offset) = offset_cursor(token, USER.id)?;
        let users = self.jira.find_users(offset, PAGE_SIZE).await?;

        let resources = users
            .iter()
            .filter(|u| !(self.skip_customer_users && u.account_type == CUSTOMER_ACCOUNT))
            .map(user_resource)
            .collect();

        let next = next_offset_cursor(stack, offset, users.len(), PAGE_SIZE as usize)?;
        Ok(ListPage::new(resources, next))
    }

    async fn list_site_users(&self, directory: &AdminDirectory, token: &str) -> ConnectorResult<ListPage<Resource>> {
        let (mut stack, cursor) = relay_cursor(token, USER.id)?;
        let site_id = site_frame(&stack, &USER)?;

        if site_id.is_empty() {
            stack.pop();
            for site in &directory.site_ids {
                stack.push(PageFrame::new(USER.id).with_resource_id(site));
            }
            debug!(sites = directory.site_ids.len(), "Expanding user listing per site");
            return Ok(ListPage::new(Vec::new(), stack.encode()?));
        }

        let (users, next) = directory.client.list_users(&site_id, &cursor).await?;
        stack.advance(next)?;
        Ok(ListPage::new(
            users.iter().map(admin_user_resource).collect(),
            stack.encode()?,
        ))
    }

    /// Invites a user. `profile.products` must be absent, null, or a list of
    /// product names.
    pub async fn create_account(&self, email: &str, profile: &Profile) -> ConnectorResult<Resource> {
        if email.is_empty() {
            return Err(ConnectorError::invalid("login is required"));
        }
        let products = products_from_profile(profile)?;
        let user = self.jira.create_user(email, &products).await?;
        Ok(user_resource(&user))
    }
}

fn products_from_profile(profile: &Profile) -> ConnectorResult<Vec<String>> {
    match profile.get("products") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(product) => Ok(product.clone()),
                other => Err(ConnectorError::invalid(format!(
                    "invalid product type: {}",
                    json_kind(other)
                ))),
            })
            .collect(),
        Some(other) => Err(ConnectorError::invalid(format!(
            "products field is not a list: {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[async_trait]
impl ResourceSyncer for UserSyncer {
    fn resource_type(&self) -> &'static ResourceType {
        &USER
    }

    async fn list(&self, _parent: Option<&ResourceId>, token: &str) -> ConnectorResult<ListPage<Resource>> {
        match &self.directory {
            Some(directory) => self.list_site_users(directory, token).await,
            None => self.list_jira_users(token).await,
        }
    }

    async fn entitlements(&self, _resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Entitlement>> {
        Ok(ListPage::last(Vec::new()))
    }

    async fn grants(&self, _resource: &Resource, _token: &str) -> ConnectorResult<ListPage<Grant>> {
        Ok(ListPage::last(Vec::new()))
    }
}
