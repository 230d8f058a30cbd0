//! Error types for identity operations
//!
//! This module defines all error types that can occur while exchanging
//! authorization codes, revalidating bearer tokens, and persisting tokens.

use thiserror::Error;

/// Identity error types.
///
/// Every failure is returned to the immediate caller untouched. Nothing in
/// this crate retries or rolls back an already completed protocol step.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Transport failure while reaching the provider
    #[error("Network error: {0}")]
    Network(String),

    /// The provider did not answer within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Provider payload was malformed or did not match the expected schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider answered with a non-success status (expired or revoked
    /// bearer, invalid grant, ...)
    #[error("Provider rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code returned by the provider.
        status: u16,
        /// Response body, if any.
        message: String,
    },

    /// Hosted domain is not on the allow-list
    #[error("email from non-allowed hosted domain {domain}")]
    PolicyViolation {
        /// The rejected hosted domain.
        domain: String,
    },

    /// No token stored under the given access token
    #[error("Not found: {0}")]
    NotFound(String),

    /// Token store read or write failure
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Uniqueness violation in the token store
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for identity operations.
pub type ProviderResult<T> = Result<T, AuthError>;

impl AuthError {
    /// Check if this error should be logged at error level.
    ///
    /// Policy rejections, missing tokens and provider rejections are expected
    /// outcomes of normal traffic.
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            AuthError::Persistence(_) | AuthError::Config(_) | AuthError::Parse(_)
        )
    }

    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            AuthError::NotFound(_) | AuthError::Rejected { .. } => 401,
            AuthError::PolicyViolation { .. } => 403,
            AuthError::Conflict(_) => 409,
            AuthError::Network(_) | AuthError::Parse(_) => 502,
            AuthError::Timeout(_) => 504,
            AuthError::Persistence(_) | AuthError::Config(_) => 500,
        }
    }

    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::Network(_) => "NETWORK_ERROR",
            AuthError::Timeout(_) => "TIMEOUT",
            AuthError::Parse(_) => "PARSE_ERROR",
            AuthError::Rejected { .. } => "PROVIDER_REJECTED",
            AuthError::PolicyViolation { .. } => "POLICY_VIOLATION",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Persistence(_) => "PERSISTENCE_ERROR",
            AuthError::Conflict(_) => "CONFLICT",
            AuthError::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AuthError::Timeout(err.to_string())
        } else if err.is_decode() {
            AuthError::Parse(err.to_string())
        } else {
            AuthError::Network(err.to_string())
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for AuthError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AuthError::Conflict(err.to_string())
            }
            _ => AuthError::Persistence(err.to_string()),
        }
    }
}
