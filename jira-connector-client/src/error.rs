//! Error types for the REST clients.

use jira_connector_types::ErrorCode;
use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur talking to Jira or the Atlassian Admin API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request did not complete before the client timeout.
    #[error("{0}: request timed out")]
    Timeout(String),

    /// Transport failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The remote answered with a non-success status.
    #[error("{context}: returned status {status}: {message}")]
    Status {
        context: String,
        status: u16,
        message: String,
    },

    /// A response body did not match the expected shape.
    #[error("failed to decode {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("jira URL cannot be empty")]
    EmptyJiraUrl,

    #[error("email cannot be empty")]
    EmptyEmail,

    #[error("cloudId field not found or empty")]
    MissingCloudId,

    #[error("failed to resolve cloud ID: {0}")]
    CloudIdResolution(Box<ClientError>),

    #[error("role id not found in role link '{0}'")]
    RoleIdNotFound(String),

    #[error("site id not found")]
    SiteIdNotFound,

    /// The session store failed.
    #[error("session store error: {0}")]
    Session(String),
}

impl ClientError {
    pub(crate) fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(context.to_string())
        } else {
            Self::Network(format!("{context} failed: {err}"))
        }
    }

    /// HTTP status of the failed call, when one was received.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::CloudIdResolution(inner) => inner.status(),
            _ => None,
        }
    }

    /// Host-visible classification of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Timeout(_) => ErrorCode::DeadlineExceeded,
            Self::Status { status, .. } => ErrorCode::from_http_status(*status),
            Self::EmptyJiraUrl | Self::EmptyEmail | Self::Config(_) => ErrorCode::InvalidArgument,
            Self::RoleIdNotFound(_) | Self::SiteIdNotFound => ErrorCode::NotFound,
            Self::CloudIdResolution(inner) => inner.code(),
            _ => ErrorCode::Unknown,
        }
    }

    /// True for a 401 response.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }

    /// True when the remote rejected the call and said why in `needle`.
    #[must_use]
    pub fn message_contains(&self, needle: &str) -> bool {
        match self {
            Self::Status { message, .. } => message.contains(needle),
            _ => false,
        }
    }
}
