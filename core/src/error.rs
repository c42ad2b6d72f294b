//! Error types for the auth API client.
//!
//! # Design
//! Every failure reaches the caller as an `ApiError` whose `Display` output is
//! ready to show to a user. Failures fall into three groups (see `ErrorKind`):
//! a required token was missing before any request was sent, the round-trip
//! itself failed, or the server answered with an error payload. Server
//! messages are surfaced verbatim.

use std::fmt;

use thiserror::Error;

/// Which stored token an operation needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// The client operation a failure belongs to. Used to give transport errors
/// some context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Health,
    Register,
    Login,
    Refresh,
    Logout,
    LogoutAll,
    Profile,
    AuditLog,
    Compare,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let what = match self {
            Operation::Health => "checking health",
            Operation::Register => "registering",
            Operation::Login => "logging in",
            Operation::Refresh => "refreshing token",
            Operation::Logout => "logging out",
            Operation::LogoutAll => "closing all sessions",
            Operation::Profile => "fetching profile",
            Operation::AuditLog => "fetching audit log",
            Operation::Compare => "comparing performance",
        };
        f.write_str(what)
    }
}

/// Coarse classification of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required token was absent; nothing was sent.
    Precondition,
    /// The request could not be completed or the response was unreadable.
    Transport,
    /// The server answered with a non-success status.
    Application,
}

/// Failure to complete an HTTP round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Connection(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Connection(e.to_string())
        }
    }
}

/// Errors returned by `AuthClient` parse methods and `SessionClient` operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The operation needs a stored token and none is held.
    #[error("no {0} token available")]
    MissingToken(TokenKind),

    /// The server returned an error status with a JSON error body.
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        code: Option<String>,
    },

    /// The server returned a status outside the accepted set and no error
    /// body is expected for this operation.
    #[error("unexpected status {status} while {operation}")]
    UnexpectedStatus { operation: Operation, status: u16 },

    /// The HTTP round-trip did not complete.
    #[error("error {operation}: {source}")]
    Transport {
        operation: Operation,
        #[source]
        source: TransportError,
    },

    /// The response body could not be decoded.
    #[error("error {operation}: malformed response: {cause}")]
    MalformedResponse { operation: Operation, cause: String },

    /// The request payload could not be encoded as JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingToken(_) => ErrorKind::Precondition,
            ApiError::Server { .. } | ApiError::UnexpectedStatus { .. } => ErrorKind::Application,
            ApiError::Transport { .. }
            | ApiError::MalformedResponse { .. }
            | ApiError::Serialization(_) => ErrorKind::Transport,
        }
    }

    /// HTTP status for failures that got as far as a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } | ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
