//! Unified application error types for Gatehouse.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. The [`ErrorKind`] is kept intact all
//! the way to the HTTP boundary so logs and metrics see the precise failure,
//! while the client-facing rendering in [`crate::http`] stays coarse for
//! security-sensitive kinds.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// No `Authorization` header was supplied.
    MissingToken,
    /// The `Authorization` header is not of the form `Bearer <token>`.
    MalformedHeader,
    /// The token was signed with an unexpected algorithm or key.
    InvalidSignature,
    /// The token is past its expiry instant.
    Expired,
    /// The token is used before its not-before instant.
    NotYetValid,
    /// The token could not be parsed.
    Malformed,
    /// Authentication failed; the precise reason is deliberately hidden.
    Unauthorized,
    /// The caller is authenticated but not permitted.
    Forbidden,
    /// The discovery backend could not be reached.
    DiscoveryUnavailable,
    /// A network operation exceeded its deadline.
    Timeout,
    /// No healthy upstream could serve the request.
    ServiceUnavailable,
    /// The requested entity was not found.
    NotFound,
    /// Input validation failed.
    Validation,
    /// A conflict occurred (duplicate name, etc.).
    Conflict,
    /// A configuration error occurred.
    Configuration,
    /// A storage I/O error occurred.
    Storage,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An unexpected internal failure.
    Internal,
}

impl ErrorKind {
    /// Whether this kind is an authentication failure.
    ///
    /// All of these collapse into one client-visible `Unauthorized` answer.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self,
            Self::MissingToken
                | Self::MalformedHeader
                | Self::InvalidSignature
                | Self::Expired
                | Self::NotYetValid
                | Self::Malformed
                | Self::Unauthorized
        )
    }

    /// Whether this kind means the upstream could not be used.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::DiscoveryUnavailable | Self::Timeout | Self::ServiceUnavailable
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "MISSING_TOKEN"),
            Self::MalformedHeader => write!(f, "MALFORMED_HEADER"),
            Self::InvalidSignature => write!(f, "INVALID_SIGNATURE"),
            Self::Expired => write!(f, "EXPIRED"),
            Self::NotYetValid => write!(f, "NOT_YET_VALID"),
            Self::Malformed => write!(f, "MALFORMED"),
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::Forbidden => write!(f, "FORBIDDEN"),
            Self::DiscoveryUnavailable => write!(f, "DISCOVERY_UNAVAILABLE"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::ServiceUnavailable => write!(f, "SERVICE_UNAVAILABLE"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Validation => write!(f, "VALIDATION"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified application error used throughout Gatehouse.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message (server-side detail).
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a missing-token error.
    pub fn missing_token(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingToken, message)
    }

    /// Create a malformed-header error.
    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedHeader, message)
    }

    /// Create an invalid-signature error.
    pub fn invalid_signature(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidSignature, message)
    }

    /// Create an expired-token error.
    pub fn expired(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Expired, message)
    }

    /// Create a not-yet-valid token error.
    pub fn not_yet_valid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotYetValid, message)
    }

    /// Create a malformed-token error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Malformed, message)
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    /// Create a discovery-unavailable error.
    pub fn discovery_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DiscoveryUnavailable, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create a service-unavailable error.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceUnavailable, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Storage, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
