//! Error types for role operations

use thiserror::Error;

/// Role store errors.
#[derive(Debug, Error)]
pub enum RoleError {
    /// Uniqueness violation (role name, or an existing binding)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A referenced role or service account does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Input rejected before reaching the store
    #[error("Invalid input: {0}")]
    Invalid(String),

    /// Store read or write failure
    #[error("Persistence error: {0}")]
    Persistence(String),
}

/// Result type for role operations.
pub type RoleResult<T> = Result<T, RoleError>;

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for RoleError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                RoleError::Conflict(err.to_string())
            }
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RoleError::NotFound(err.to_string())
            }
            _ => RoleError::Persistence(err.to_string()),
        }
    }
}
