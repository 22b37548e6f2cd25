use std::fmt;

use crate::page::cursor::CursorError;
use crate::source::SourceError;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotInitialized,
    ConfigParseError,
    InvalidCursor,
    InvalidArgument,
    PostNotFound,
    CommentNotFound,
    ScopeMismatch,
    QueryCancelled,
    StorageFailure,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotInitialized => "E1001",
            Self::ConfigParseError => "E1002",
            Self::InvalidCursor => "E2001",
            Self::InvalidArgument => "E2002",
            Self::PostNotFound => "E3001",
            Self::CommentNotFound => "E3002",
            Self::ScopeMismatch => "E3003",
            Self::QueryCancelled => "E4001",
            Self::StorageFailure => "E5001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotInitialized => "Project not initialized",
            Self::ConfigParseError => "Config file parse error",
            Self::InvalidCursor => "Invalid cursor",
            Self::InvalidArgument => "Invalid pagination argument",
            Self::PostNotFound => "Post not found",
            Self::CommentNotFound => "Comment not found",
            Self::ScopeMismatch => "Anchor belongs to a different post",
            Self::QueryCancelled => "Query cancelled",
            Self::StorageFailure => "Storage failure",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotInitialized => Some("Run `ql init` to initialize this directory."),
            Self::ConfigParseError => Some("Fix syntax in .quill/config.toml and retry."),
            Self::InvalidCursor => {
                Some("Pass back a cursor exactly as returned by a previous page.")
            }
            Self::InvalidArgument => {
                Some("Use either --first/--after or --last/--before, within the page size limit.")
            }
            Self::PostNotFound | Self::CommentNotFound => None,
            Self::ScopeMismatch => Some("Pick an anchor comment that belongs to the requested post."),
            Self::QueryCancelled => Some("Retry, or raise query_timeout_ms in .quill/config.toml."),
            Self::StorageFailure => Some("Check the database file and its permissions."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by the pagination operations.
///
/// Nothing here is retried internally. Pagination reads are idempotent, so a
/// caller may retry at a higher layer.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The cursor could not be decoded.
    #[error("invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),

    /// Malformed argument combination or out-of-range count.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The anchor comment or the scoping post does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    /// The anchor exists but belongs to another post.
    #[error("comment {anchor_id} belongs to post {actual_post}, not post {expected_post}")]
    ScopeMismatch {
        anchor_id: i64,
        expected_post: i64,
        actual_post: i64,
    },

    /// The caller cancelled or the query deadline passed.
    #[error("query cancelled")]
    Cancelled,

    /// The row source failed.
    #[error("storage error: {0:#}")]
    Storage(#[source] anyhow::Error),
}

/// Kind of record a [`PageError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Post,
    Comment,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post => f.write_str("post"),
            Self::Comment => f.write_str("comment"),
        }
    }
}

impl PageError {
    pub(crate) fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidCursor(_) => ErrorCode::InvalidCursor,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::NotFound {
                entity: Entity::Post,
                ..
            } => ErrorCode::PostNotFound,
            Self::NotFound {
                entity: Entity::Comment,
                ..
            } => ErrorCode::CommentNotFound,
            Self::ScopeMismatch { .. } => ErrorCode::ScopeMismatch,
            Self::Cancelled => ErrorCode::QueryCancelled,
            Self::Storage(_) => ErrorCode::StorageFailure,
        }
    }

    /// Optional remediation hint for operators and agents.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }

    /// Whether the error was caused by the caller's input rather than the system.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidCursor(_)
                | Self::InvalidArgument(_)
                | Self::NotFound { .. }
                | Self::ScopeMismatch { .. }
        )
    }
}

impl From<SourceError> for PageError {
    fn from(err: SourceError) -> Self {
        match err {
            SourceError::Cancelled => Self::Cancelled,
            SourceError::Backend(err) => Self::Storage(err),
        }
    }
}
