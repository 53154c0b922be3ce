//! Error types shared by the token, rating and account engines
//!
//! Every engine operation returns a [`CoreResult`]. The variant is the error
//! kind the HTTP layer maps 1:1 onto a status code, and the payload is the
//! client-facing message.

use thiserror::Error;

/// Result type for engine operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Typed outcome of a failed engine operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Bad credentials, or an invalid, expired, outdated or revoked token
    #[error("{0}")]
    Unauthorized(String),

    /// Missing account, variation or parameter
    #[error("{0}")]
    NotFound(String),

    /// Redundant vote or unvote
    #[error("{0}")]
    Conflict(String),

    /// Malformed input, e.g. an insecure password
    #[error("{0}")]
    BadRequest(String),

    /// Required agreements not given
    #[error("{0}")]
    Forbidden(String),

    /// Store failure, signing failure, or a partial multi-store write
    #[error("{0}")]
    Internal(String),
}

/// Coarse error kind, used for metrics labels and status mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Unauthorized,
    NotFound,
    Conflict,
    BadRequest,
    Forbidden,
    Internal,
}

impl CoreError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        CoreError::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        CoreError::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        CoreError::Conflict(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        CoreError::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        CoreError::Forbidden(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        CoreError::Internal(msg.into())
    }

    /// Log a store failure and turn it into a client-safe internal error
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        tracing::error!(error = %err, "{}", context);
        CoreError::Internal(context.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Unauthorized(_) => ErrorKind::Unauthorized,
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::Conflict(_) => ErrorKind::Conflict,
            CoreError::BadRequest(_) => ErrorKind::BadRequest,
            CoreError::Forbidden(_) => ErrorKind::Forbidden,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// The client-facing message
    pub fn message(&self) -> &str {
        match self {
            CoreError::Unauthorized(msg)
            | CoreError::NotFound(msg)
            | CoreError::Conflict(msg)
            | CoreError::BadRequest(msg)
            | CoreError::Forbidden(msg)
            | CoreError::Internal(msg) => msg,
        }
    }
}

impl ErrorKind {
    /// HTTP status code for this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::Unauthorized => 401,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::BadRequest => 400,
            ErrorKind::Forbidden => 403,
            ErrorKind::Internal => 500,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::BadRequest => "bad_request",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Internal => "internal",
        }
    }
}
