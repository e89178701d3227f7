//! Error types for the connector operations.

use jira_connector_client::ClientError;
use jira_connector_types::{CursorError, ErrorCode, TicketError};
use std::path::PathBuf;
use thiserror::Error;

/// Result type for connector operations.
pub type ConnectorResult<T> = Result<T, ConnectorError>;

/// Errors surfaced to the host by connector operations.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A remote call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The page token could not be decoded.
    #[error("invalid page token: {0}")]
    Cursor(#[from] CursorError),

    /// A ticket did not conform to its schema.
    #[error("invalid ticket: {0}")]
    Ticket(#[from] TicketError),

    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    /// The operation is switched off by configuration.
    #[error("{0}")]
    Unimplemented(String),

    /// A required setting is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConnectorError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Host-visible classification of this error.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Client(e) => e.code(),
            Self::Cursor(e) => e.code(),
            Self::Ticket(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. } => ErrorCode::InvalidArgument,
            Self::NotFound(_) => ErrorCode::NotFound,
            Self::Unimplemented(_) => ErrorCode::Unimplemented,
            Self::Serialization(_) => ErrorCode::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_the_source() {
        let err = ConnectorError::from(ClientError::Status {
            context: "get project".into(),
            status: 404,
            message: String::new(),
        });
        assert_eq!(err.code(), ErrorCode::NotFound);

        let err = ConnectorError::from(CursorError::Malformed("x".into()));
        assert_eq!(err.code(), ErrorCode::InvalidArgument);
        assert!(!err.code().is_retryable());

        assert_eq!(
            ConnectorError::Unimplemented("ticketing disabled".into()).code(),
            ErrorCode::Unimplemented
        );
    }
}
