//! PostgreSQL role store
//!
//! Expects the following tables (migrations are owned by the embedding
//! service):
//!
//! ```sql
//! CREATE TABLE roles (
//!     id   UUID PRIMARY KEY,
//!     name TEXT NOT NULL UNIQUE
//! );
//!
//! CREATE TABLE role_bindings (
//!     role_id            UUID NOT NULL REFERENCES roles (id),
//!     service_account_id TEXT NOT NULL REFERENCES service_accounts (id),
//!     UNIQUE (role_id, service_account_id)
//! );
//! ```

use crate::error::RoleResult;
use crate::roles::{Role, ServiceAccountId};
use crate::store::{validate_name, RoleStore};
use async_trait::async_trait;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use uuid::Uuid;

#[derive(FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
}

/// Role store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgRoleStore {
    pool: PgPool,
}

impl PgRoleStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleStore for PgRoleStore {
    #[instrument(skip_all, fields(service_account_id = %service_account_id))]
    async fn for_service_account_id(
        &self,
        service_account_id: &ServiceAccountId,
    ) -> RoleResult<HashSet<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT r.id, r.name FROM roles r
            JOIN role_bindings rb ON rb.role_id = r.id
            WHERE rb.service_account_id = $1
            "#,
        )
        .bind(service_account_id.as_str())
        .fetch_all(&self.pool)
        .await?;

        debug!(count = rows.len(), "Loaded roles for service account");
        Ok(rows
            .into_iter()
            .map(|row| Role {
                id: row.id,
                name: row.name,
            })
            .collect())
    }

    #[instrument(skip(self, role), fields(name = %role.name))]
    async fn create(&self, role: &mut Role) -> RoleResult<()> {
        validate_name(&role.name)?;

        let id: Uuid = sqlx::query_scalar("INSERT INTO roles (id, name) VALUES ($1, $2) RETURNING id")
            .bind(Uuid::now_v7())
            .bind(&role.name)
            .fetch_one(&self.pool)
            .await?;

        role.id = id;
        info!(role_id = %role.id, "Role created");
        Ok(())
    }

    #[instrument(skip_all, fields(role_id = %role.id, service_account_id = %service_account_id))]
    async fn bind(&self, role: &Role, service_account_id: &ServiceAccountId) -> RoleResult<()> {
        sqlx::query(
            r#"
            INSERT INTO role_bindings (role_id, service_account_id)
            VALUES ($1, $2)
            "#,
        )
        .bind(role.id)
        .bind(service_account_id.as_str())
        .execute(&self.pool)
        .await?;

        info!("Role bound to service account");
        Ok(())
    }
}
