//! Request-level error taxonomy.
//!
//! Every variant is terminal for the request that raised it. Translation to
//! HTTP happens in the service layer through [`ForumError::status_code`].

use crate::auth::TokenError;

/// Error returned by forum operations.
#[derive(Debug, thiserror::Error)]
pub enum ForumError {
    /// Missing, malformed or expired bearer token, or a token whose subject
    /// no longer exists.
    #[error("{0}")]
    Unauthenticated(String),
    /// Login with an unknown username or a wrong password.
    #[error("Invalid credentials")]
    InvalidCredentials,
    /// Authenticated but not allowed to see or change the resource.
    #[error("{0}")]
    Forbidden(String),
    /// Referenced entity does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Create would violate a unique key.
    #[error("{0}")]
    Conflict(String),
    /// Request payload rejected before touching storage.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Storage backend failure.
    #[error("Store error: {0}")]
    Store(String),
    /// Anything else that should never reach a client.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ForumError {
    /// Create a store error from any backend error type.
    pub fn from_store<E: std::error::Error>(e: E) -> Self {
        Self::Store(e.to_string())
    }

    /// Generic access-denied error.
    pub fn access_denied() -> Self {
        Self::Forbidden("You do not have permission to access this resource.".to_string())
    }

    /// HTTP status the routing layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Unauthenticated(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::InvalidCredentials | Self::Conflict(_) | Self::InvalidInput(_) => 400,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => "UNAUTHENTICATED",
            Self::InvalidCredentials => "INVALID_CREDENTIALS",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::Store(_) => "STORE_ERROR",
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<TokenError> for ForumError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Self::Unauthenticated("Token has expired".to_string()),
            TokenError::Invalid => Self::Unauthenticated("Invalid credentials".to_string()),
            TokenError::Encoding(msg) => Self::Internal(msg),
        }
    }
}

/// Result alias for forum operations.
pub type ForumResult<T> = Result<T, ForumError>;
