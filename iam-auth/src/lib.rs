//! # IAM Authentication
//!
//! This crate federates third-party identity into verified
//! `(access token, email)` pairs.
//!
//! ## Overview
//!
//! The iam-auth crate handles:
//! - **Providers**: a provider-agnostic capability set
//!   ([`OAuthProviderClient`]) and a [`ProviderRegistry`] to select one by name
//! - **Google**: authorization code exchange, userinfo lookup and
//!   hosted-domain allow-listing ([`GoogleProvider`])
//! - **Tokens**: the [`Token`] record and the [`TokenStore`] contract
//!
//! ## Features
//!
//! - `postgres`: [`PgTokenStore`] backed by sqlx
//!
//! ## Usage
//!
//! ```rust,no_run
//! use iam_auth::{GoogleConfig, GoogleProvider, MemoryTokenStore, OAuthProviderClient, OAuthState};
//! use std::sync::Arc;
//!
//! # async fn run() -> iam_auth::ProviderResult<()> {
//! let config = GoogleConfig::new("client-id", "client-secret", "https://app.example/callback")
//!     .with_hosted_domains(["example.com"]);
//! let google = GoogleProvider::new(config, Arc::new(MemoryTokenStore::new()))?;
//!
//! // Redirect the user here, remembering the state
//! let state = OAuthState::new();
//! let url = google.build_auth_url(&state.state);
//!
//! // On callback
//! let identity = google.exchange_code("code-from-callback").await?;
//!
//! // Later, on each request carrying the bearer
//! let identity = google.authenticate(&identity.access_token).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod google;
pub mod oauth;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod token;

// Re-export main types
pub use error::{AuthError, ProviderResult};
pub use google::{GoogleConfig, GoogleProvider};
pub use oauth::{AuthResult, OAuthProvider, OAuthProviderClient, OAuthState, ProviderRegistry};
#[cfg(feature = "postgres")]
pub use postgres::PgTokenStore;
pub use token::{MemoryTokenStore, Token, TokenStore};
