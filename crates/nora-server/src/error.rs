//! Server and request errors.

#![allow(missing_docs)]

use std::fmt;

use smol_str::SmolStr;
use thiserror::Error;

/// Errors raised while configuring or starting the servers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServerError {
    /// Configuration error.
    #[error("invalid config '{0}'")]
    InvalidConfig(SmolStr),

    /// Listener could not be bound.
    #[error("bind failed '{0}'")]
    Bind(SmolStr),

    /// Filesystem error outside of request handling.
    #[error("i/o error '{0}'")]
    Io(SmolStr),

    /// Frontend discovery file could not be written.
    #[error("discovery file error '{0}'")]
    Discovery(SmolStr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    InvalidInput,
    NotFound,
    Internal,
}

/// A request-level failure carrying the message sent back to the client.
#[derive(Debug, Clone)]
pub struct ApiError {
    kind: ApiErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::InvalidInput, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::NotFound, message)
    }

    /// Internal failure; the I/O cause is logged, never sent to the client.
    pub fn internal(message: impl Into<String>, cause: &std::io::Error) -> Self {
        let message = message.into();
        tracing::warn!(error = %cause, "{message}");
        Self::new(ApiErrorKind::Internal, message)
    }

    #[must_use]
    pub fn kind(&self) -> ApiErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self.kind {
            ApiErrorKind::InvalidInput => 400,
            ApiErrorKind::NotFound => 404,
            ApiErrorKind::Internal => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_kind() {
        assert_eq!(ApiError::invalid("bad").status_code(), 400);
        assert_eq!(ApiError::not_found("gone").status_code(), 404);
        let io = std::io::Error::other("disk");
        let err = ApiError::internal("Failed to write", &io);
        assert_eq!(err.status_code(), 500);
        assert_eq!(err.message(), "Failed to write");
    }
}
