//! Error types for the data model and the host-visible status taxonomy.

use thiserror::Error;

/// Status category reported to the host for every failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DeadlineExceeded,
    Unavailable,
    Unauthenticated,
    NotFound,
    PermissionDenied,
    Unimplemented,
    InvalidArgument,
    Unknown,
}

impl ErrorCode {
    /// Classifies an HTTP status returned by a remote API.
    #[must_use]
    pub fn from_http_status(status: u16) -> Self {
        match status {
            429 | 503 => Self::Unavailable,
            401 => Self::Unauthenticated,
            404 => Self::NotFound,
            403 => Self::PermissionDenied,
            501 => Self::Unimplemented,
            _ => Self::Unknown,
        }
    }

    /// Whether the host may retry the call unchanged.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Unavailable)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DeadlineExceeded => "deadline_exceeded",
            Self::Unavailable => "unavailable",
            Self::Unauthenticated => "unauthenticated",
            Self::NotFound => "not_found",
            Self::PermissionDenied => "permission_denied",
            Self::Unimplemented => "unimplemented",
            Self::InvalidArgument => "invalid_argument",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type for cursor operations.
pub type CursorResult<T> = Result<T, CursorError>;

/// Errors raised while decoding or manipulating a page cursor.
#[derive(Debug, Error)]
pub enum CursorError {
    /// The token handed back by the host is not one this codec produced.
    #[error("malformed page token: {0}")]
    Malformed(String),

    /// `advance` was called on a stack with no current frame.
    #[error("no active page state")]
    NoActiveFrame,

    /// Encoding the stack failed.
    #[error("failed to encode page token: {0}")]
    Encode(#[from] serde_json::Error),
}

impl CursorError {
    /// Cursor failures are never retryable.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Malformed(_) | Self::NoActiveFrame => ErrorCode::InvalidArgument,
            Self::Encode(_) => ErrorCode::Unknown,
        }
    }
}

/// Result type for ticket validation.
pub type TicketResult<T> = Result<T, TicketError>;

/// A ticket does not conform to the schema it claims.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("ticket is invalid: required field '{field}' is missing")]
    MissingRequiredField { field: String },

    #[error("ticket is invalid: field '{field}' expects a {expected} value, got {found}")]
    WrongFieldShape {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("ticket is invalid: '{value}' is not an allowed choice for field '{field}'")]
    InvalidChoice { field: String, value: String },
}

impl TicketError {
    /// Id of the custom field that failed validation.
    #[must_use]
    pub fn field(&self) -> &str {
        match self {
            Self::MissingRequiredField { field }
            | Self::WrongFieldShape { field, .. }
            | Self::InvalidChoice { field, .. } => field,
        }
    }
}

/// Extracting a typed value out of a custom field failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldValueError {
    #[error("custom field value is not set")]
    Missing,

    #[error("custom field value is a {found}, expected {expected}")]
    WrongShape {
        expected: &'static str,
        found: &'static str,
    },
}
