//! Roles, service accounts and role bindings
//!
//! A [`Role`] is granted to a service account through a [`RoleBinding`].
//! Bindings are insert-only: a grant is never updated in place.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a service account.
///
/// Service accounts are owned by another component; this crate only
/// references them by id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct ServiceAccountId(String);

impl ServiceAccountId {
    /// Wrap an identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ServiceAccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceAccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ServiceAccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A named role.
///
/// # Examples
///
/// ```
/// use iam_roles::Role;
///
/// let role = Role::new("admin");
/// assert!(!role.is_persisted());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Role {
    /// Store-assigned id; nil until the role has been created
    pub id: Uuid,

    /// Unique role name
    pub name: String,
}

impl Role {
    /// Create an unsaved role.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
        }
    }

    /// Check whether a store has assigned an id.
    pub fn is_persisted(&self) -> bool {
        !self.id.is_nil()
    }
}

/// Grant of a role to a service account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct RoleBinding {
    /// Bound role
    pub role_id: Uuid,

    /// Service account holding the role
    pub service_account_id: ServiceAccountId,
}

impl RoleBinding {
    /// Create a binding.
    pub fn new(role_id: Uuid, service_account_id: ServiceAccountId) -> Self {
        Self {
            role_id,
            service_account_id,
        }
    }
}
