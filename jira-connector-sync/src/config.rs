//! Connector configuration, read from a TOML file and/or CLI flags.
//!
//! ```toml
//! jira_url = "https://example.atlassian.net"
//! jira_email = "admin@example.com"
//! jira_api_token = "..."
//! jira_project_keys = ["PLAT", "OPS"]
//! ticketing_enabled = true
//! ```

use crate::error::{ConnectorError, ConnectorResult};
use jira_connector_client::atlassian::DEFAULT_ADMIN_API_BASE_URL;
use jira_connector_client::service_account::DEFAULT_SCOPED_API_BASE_URL;
use jira_connector_client::{AtlassianConfig, JiraConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    #[serde(default)]
    pub jira_url: String,
    #[serde(default)]
    pub jira_email: String,
    #[serde(default)]
    pub jira_api_token: String,
    /// Restricts ticket schemas to these projects. Empty means all.
    #[serde(default)]
    pub jira_project_keys: Vec<String>,
    /// Skips the "every user participates in a public project" grants.
    #[serde(default)]
    pub skip_project_participants: bool,
    /// Leaves Jira Service Management customers out of the user listing.
    #[serde(default)]
    pub skip_customer_users: bool,
    #[serde(default)]
    pub ticketing_enabled: bool,
    /// Organization id for the Admin API. Users and groups are listed
    /// through the Admin API when this and the access token are set.
    #[serde(default)]
    pub atlassian_org_id: Option<String>,
    #[serde(default)]
    pub atlassian_access_token: Option<String>,
    #[serde(default = "default_admin_api_base_url")]
    pub admin_api_base_url: String,
    #[serde(default = "default_scoped_api_base_url")]
    pub scoped_api_base_url: String,
}

fn default_admin_api_base_url() -> String {
    DEFAULT_ADMIN_API_BASE_URL.to_string()
}

fn default_scoped_api_base_url() -> String {
    DEFAULT_SCOPED_API_BASE_URL.to_string()
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            jira_url: String::new(),
            jira_email: String::new(),
            jira_api_token: String::new(),
            jira_project_keys: Vec::new(),
            skip_project_participants: false,
            skip_customer_users: false,
            ticketing_enabled: false,
            atlassian_org_id: None,
            atlassian_access_token: None,
            admin_api_base_url: default_admin_api_base_url(),
            scoped_api_base_url: default_scoped_api_base_url(),
        }
    }
}

impl fmt::Debug for ConnectorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("jira_url", &self.jira_url)
            .field("jira_email", &self.jira_email)
            .field("jira_api_token", &"<redacted>")
            .field("jira_project_keys", &self.jira_project_keys)
            .field("skip_project_participants", &self.skip_project_participants)
            .field("skip_customer_users", &self.skip_customer_users)
            .field("ticketing_enabled", &self.ticketing_enabled)
            .field("atlassian_org_id", &self.atlassian_org_id)
            .field(
                "atlassian_access_token",
                &self.atlassian_access_token.as_ref().map(|_| "<redacted>"),
            )
            .field("admin_api_base_url", &self.admin_api_base_url)
            .field("scoped_api_base_url", &self.scoped_api_base_url)
            .finish()
    }
}

impl ConnectorConfig {
    /// Parses a TOML document.
    pub fn from_toml_str(contents: &str, origin: &Path) -> ConnectorResult<Self> {
        toml::from_str(contents).map_err(|source| ConnectorError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    /// Reads a TOML config file.
    pub fn load_from(path: &Path) -> ConnectorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConnectorError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&contents, path)?;
        info!("Loaded connector config from {:?}", path);
        Ok(config)
    }

    /// Checks that every required setting is present. Fields are named by
    /// their flag names.
    pub fn validate(&self) -> ConnectorResult<()> {
        let required = [
            ("jira-url", &self.jira_url),
            ("jira-email", &self.jira_email),
            ("jira-api-token", &self.jira_api_token),
        ];
        for (flag, value) in required {
            if value.trim().is_empty() {
                return Err(ConnectorError::Config(format!("{flag} is required")));
            }
        }

        match (self.org_id(), self.access_token()) {
            (Some(_), None) => Err(ConnectorError::Config(
                "atlassian-access-token is required with atlassian-org-id".to_string(),
            )),
            (None, Some(_)) => Err(ConnectorError::Config(
                "atlassian-org-id is required with atlassian-access-token".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Configured project keys, trimmed, without empty entries.
    #[must_use]
    pub fn project_keys(&self) -> Vec<String> {
        self.jira_project_keys
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .map(String::from)
            .collect()
    }

    fn org_id(&self) -> Option<&str> {
        self.atlassian_org_id.as_deref().filter(|s| !s.is_empty())
    }

    fn access_token(&self) -> Option<&str> {
        self.atlassian_access_token
            .as_deref()
            .filter(|s| !s.is_empty())
    }

    /// True when users and groups come from the Admin API.
    #[must_use]
    pub fn uses_admin_api(&self) -> bool {
        self.org_id().is_some() && self.access_token().is_some()
    }

    #[must_use]
    pub fn jira(&self) -> JiraConfig {
        JiraConfig {
            url: self.jira_url.clone(),
            email: self.jira_email.clone(),
            api_token: self.jira_api_token.clone(),
            scoped_api_base_url: self.scoped_api_base_url.clone(),
        }
    }

    /// Admin API settings, when configured.
    #[must_use]
    pub fn atlassian(&self) -> Option<AtlassianConfig> {
        let (org_id, token) = (self.org_id()?, self.access_token()?);
        Some(AtlassianConfig {
            base_url: self.admin_api_base_url.clone(),
            ..AtlassianConfig::new(org_id, token)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConnectorConfig {
        ConnectorConfig {
            jira_url: "https://example.atlassian.net".into(),
            jira_email: "admin@example.com".into(),
            jira_api_token: "token".into(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_required_fields_are_named_by_flag() {
        let err = ConnectorConfig::default().validate().unwrap_err();
        assert_eq!(err.to_string(), "configuration error: jira-url is required");

        let config = ConnectorConfig {
            jira_api_token: "  ".into(),
            ..minimal()
        };
        assert!(config.validate().unwrap_err().to_string().contains("jira-api-token"));
        assert!(minimal().validate().is_ok());
    }

    #[test]
    fn admin_settings_come_in_pairs() {
        let config = ConnectorConfig {
            atlassian_org_id: Some("org-1".into()),
            ..minimal()
        };
        assert!(config.validate().is_err());
        assert!(!config.uses_admin_api());
        assert!(config.atlassian().is_none());

        let config = ConnectorConfig {
            atlassian_access_token: Some("secret".into()),
            ..config
        };
        assert!(config.validate().is_ok());
        assert!(config.uses_admin_api());
        assert_eq!(config.atlassian().unwrap().organization_id, "org-1");
    }

    #[test]
    fn project_keys_are_trimmed() {
        let config = ConnectorConfig {
            jira_project_keys: vec![" PLAT ".into(), String::new(), "OPS".into()],
            ..minimal()
        };
        assert_eq!(config.project_keys(), vec!["PLAT".to_string(), "OPS".to_string()]);
    }

    #[test]
    fn debug_hides_secrets() {
        let config = ConnectorConfig {
            atlassian_access_token: Some("admin-secret".into()),
            ..minimal()
        };
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("admin-secret"));
        assert!(!rendered.contains("\"token\""));
    }
}
