//! Role store contract and in-memory implementation
//!
//! Uniqueness of role names and of `(role, service account)` bindings is a
//! store responsibility; both surface as [`RoleError::Conflict`].

use crate::error::{RoleError, RoleResult};
use crate::roles::{Role, RoleBinding, ServiceAccountId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Storage for roles and role bindings.
#[async_trait]
pub trait RoleStore: Send + Sync {
    /// Roles bound to a service account.
    ///
    /// Empty when the account holds no bindings. Unordered.
    async fn for_service_account_id(
        &self,
        service_account_id: &ServiceAccountId,
    ) -> RoleResult<HashSet<Role>>;

    /// Insert a role and assign its generated id to `role.id`.
    async fn create(&self, role: &mut Role) -> RoleResult<()>;

    /// Grant `role` to a service account.
    async fn bind(&self, role: &Role, service_account_id: &ServiceAccountId) -> RoleResult<()>;
}

pub(crate) fn validate_name(name: &str) -> RoleResult<()> {
    if name.trim().is_empty() {
        return Err(RoleError::Invalid("role name must not be blank".to_string()));
    }
    Ok(())
}

#[derive(Default)]
struct State {
    roles: HashMap<Uuid, Role>,
    bindings: HashSet<RoleBinding>,
    service_accounts: HashSet<ServiceAccountId>,
}

/// In-memory role store.
///
/// Service accounts are owned elsewhere, so they must be registered with
/// [`MemoryRoleStore::register_service_account`] before roles can be bound
/// to them.
#[derive(Default)]
pub struct MemoryRoleStore {
    state: RwLock<State>,
}

impl std::fmt::Debug for MemoryRoleStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryRoleStore").finish_non_exhaustive()
    }
}

impl MemoryRoleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a service account known to the store.
    pub async fn register_service_account(&self, id: impl Into<ServiceAccountId>) {
        self.state.write().await.service_accounts.insert(id.into());
    }

    /// All bindings, in no particular order.
    pub async fn bindings(&self) -> Vec<RoleBinding> {
        self.state.read().await.bindings.iter().cloned().collect()
    }
}

#[async_trait]
impl RoleStore for MemoryRoleStore {
    #[instrument(skip_all, fields(service_account_id = %service_account_id))]
    async fn for_service_account_id(
        &self,
        service_account_id: &ServiceAccountId,
    ) -> RoleResult<HashSet<Role>> {
        let state = self.state.read().await;
        let roles: HashSet<Role> = state
            .bindings
            .iter()
            .filter(|b| &b.service_account_id == service_account_id)
            .filter_map(|b| state.roles.get(&b.role_id).cloned())
            .collect();

        debug!(count = roles.len(), "Loaded roles for service account");
        Ok(roles)
    }

    #[instrument(skip(self, role), fields(name = %role.name))]
    async fn create(&self, role: &mut Role) -> RoleResult<()> {
        validate_name(&role.name)?;

        let mut state = self.state.write().await;
        if state.roles.values().any(|r| r.name == role.name) {
            return Err(RoleError::Conflict(format!(
                "role '{}' already exists",
                role.name
            )));
        }

        role.id = Uuid::now_v7();
        state.roles.insert(role.id, role.clone());

        info!(role_id = %role.id, "Role created");
        Ok(())
    }

    #[instrument(skip_all, fields(role_id = %role.id, service_account_id = %service_account_id))]
    async fn bind(&self, role: &Role, service_account_id: &ServiceAccountId) -> RoleResult<()> {
        let mut state = self.state.write().await;

        if !state.roles.contains_key(&role.id) {
            return Err(RoleError::NotFound(format!("role {}", role.id)));
        }
        if !state.service_accounts.contains(service_account_id) {
            return Err(RoleError::NotFound(format!(
                "service account {}",
                service_account_id
            )));
        }

        let binding = RoleBinding::new(role.id, service_account_id.clone());
        if !state.bindings.insert(binding) {
            return Err(RoleError::Conflict(format!(
                "role '{}' already bound to service account {}",
                role.name, service_account_id
            )));
        }

        info!("Role bound to service account");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store_with_accounts(accounts: &[&str]) -> MemoryRoleStore {
        let store = MemoryRoleStore::new();
        for sa in accounts {
            store.register_service_account(*sa).await;
        }
        store
    }

    #[tokio::test]
    async fn test_create_assigns_id() {
        let store = MemoryRoleStore::new();
        let mut role = Role::new("admin");
        store.create(&mut role).await.unwrap();
        assert!(role.is_persisted());
    }

    #[tokio::test]
    async fn test_create_duplicate_name_conflicts() {
        let store = MemoryRoleStore::new();
        store.create(&mut Role::new("admin")).await.unwrap();

        let mut again = Role::new("admin");
        let err = store.create(&mut again).await.unwrap_err();
        assert!(matches!(err, RoleError::Conflict(_)));
        assert!(!again.is_persisted());
    }

    #[tokio::test]
    async fn test_create_blank_name_rejected() {
        let store = MemoryRoleStore::new();
        let err = store.create(&mut Role::new("  ")).await.unwrap_err();
        assert!(matches!(err, RoleError::Invalid(_)));
    }

    #[tokio::test]
    async fn test_bind_and_query() {
        let store = store_with_accounts(&["sa1"]).await;
        let mut admin = Role::new("admin");
        store.create(&mut admin).await.unwrap();

        let sa1 = ServiceAccountId::from("sa1");
        store.bind(&admin, &sa1).await.unwrap();

        let roles = store.for_service_account_id(&sa1).await.unwrap();
        assert_eq!(roles.len(), 1);
        let role = roles.iter().next().unwrap();
        assert_eq!(role.name, "admin");
        assert_eq!(role.id, admin.id);
    }

    #[tokio::test]
    async fn test_no_bindings_is_empty_set() {
        let store = store_with_accounts(&["sa1"]).await;
        store.create(&mut Role::new("admin")).await.unwrap();

        let roles = store
            .for_service_account_id(&ServiceAccountId::from("sa1"))
            .await
            .unwrap();
        assert!(roles.is_empty());

        let roles = store
            .for_service_account_id(&ServiceAccountId::from("unknown"))
            .await
            .unwrap();
        assert!(roles.is_empty());
    }

    #[tokio::test]
    async fn test_query_independent_of_binding_order() {
        let names = ["reader", "writer", "admin"];

        let mut results = Vec::new();
        for order in [[0, 1, 2], [2, 0, 1]] {
            let store = store_with_accounts(&["sa1", "sa2"]).await;
            let mut roles = Vec::new();
            for name in names {
                let mut role = Role::new(name);
                store.create(&mut role).await.unwrap();
                roles.push(role);
            }

            let sa1 = ServiceAccountId::from("sa1");
            for i in order {
                store.bind(&roles[i], &sa1).await.unwrap();
            }
            store
                .bind(&roles[0], &ServiceAccountId::from("sa2"))
                .await
                .unwrap();

            let bound: HashSet<String> = store
                .for_service_account_id(&sa1)
                .await
                .unwrap()
                .into_iter()
                .map(|r| r.name)
                .collect();
            results.push(bound);
        }

        let expected: HashSet<String> = names.iter().map(|s| s.to_string()).collect();
        assert_eq!(results[0], expected);
        assert_eq!(results[1], expected);
    }

    #[tokio::test]
    async fn test_duplicate_bind_conflicts() {
        let store = store_with_accounts(&["sa1"]).await;
        let mut admin = Role::new("admin");
        store.create(&mut admin).await.unwrap();

        let sa1 = ServiceAccountId::from("sa1");
        store.bind(&admin, &sa1).await.unwrap();
        let err = store.bind(&admin, &sa1).await.unwrap_err();
        assert!(matches!(err, RoleError::Conflict(_)));
        assert_eq!(store.bindings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_bind_requires_existing_references() {
        let store = store_with_accounts(&["sa1"]).await;

        let unsaved = Role::new("ghost");
        let err = store
            .bind(&unsaved, &ServiceAccountId::from("sa1"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::NotFound(_)));

        let mut admin = Role::new("admin");
        store.create(&mut admin).await.unwrap();
        let err = store
            .bind(&admin, &ServiceAccountId::from("missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, RoleError::NotFound(_)));
        assert!(store.bindings().await.is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_binds_resolve_to_one() {
        let store = Arc::new(store_with_accounts(&["sa1"]).await);
        let mut admin = Role::new("admin");
        store.create(&mut admin).await.unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let admin = admin.clone();
                tokio::spawn(async move { store.bind(&admin, &ServiceAccountId::from("sa1")).await })
            })
            .collect();

        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.bindings().await.len(), 1);
    }
}
