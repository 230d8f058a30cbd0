//! # IAM Roles
//!
//! This crate grants roles to service accounts and answers which roles a
//! service account holds. Access-control decisions downstream read from it.
//!
//! ## Architecture
//!
//! ```text
//! Role ──┐
//!        ├─ RoleBinding (many-to-many, insert-only)
//! ServiceAccount ──┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use iam_roles::{MemoryRoleStore, Role, RoleStore, ServiceAccountId};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> iam_roles::RoleResult<()> {
//! let store = MemoryRoleStore::new();
//! store.register_service_account("sa1").await;
//!
//! let mut admin = Role::new("admin");
//! store.create(&mut admin).await?;
//!
//! let sa = ServiceAccountId::from("sa1");
//! store.bind(&admin, &sa).await?;
//!
//! let roles = store.for_service_account_id(&sa).await?;
//! assert!(roles.contains(&admin));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `postgres`: [`PgRoleStore`] backed by sqlx

pub mod error;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod roles;
pub mod store;

// Re-export main types for convenience
pub use error::{RoleError, RoleResult};
#[cfg(feature = "postgres")]
pub use postgres::PgRoleStore;
pub use roles::{Role, RoleBinding, ServiceAccountId};
pub use store::{MemoryRoleStore, RoleStore};
