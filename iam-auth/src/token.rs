//! Token records and the token store contract
//!
//! A [`Token`] is written once per successful code exchange and read on every
//! revalidation. Records are keyed by their access token value.

use crate::error::{AuthError, ProviderResult};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Persisted OAuth token.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Token {
    /// Access token, the natural key
    pub access_token: String,

    /// Refresh token, when the provider issued one
    pub refresh_token: Option<String>,

    /// Token type (usually "Bearer")
    pub token_type: String,

    /// Absolute expiry
    pub expiry: DateTime<Utc>,

    /// Email reported by the provider's identity endpoint
    pub email: String,
}

impl Token {
    /// Create a token expiring `expires_in_secs` seconds from now.
    ///
    /// Fails with [`AuthError::Parse`] unless the lifetime is positive and the
    /// resulting expiry is representable.
    pub fn issued_now(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        token_type: impl Into<String>,
        expires_in_secs: i64,
        email: impl Into<String>,
    ) -> ProviderResult<Self> {
        Ok(Self {
            access_token: access_token.into(),
            refresh_token,
            token_type: token_type.into(),
            expiry: expiry_after(expires_in_secs)?,
            email: email.into(),
        })
    }

    /// Check whether the expiry has passed.
    pub fn is_expired(&self) -> bool {
        self.expiry <= Utc::now()
    }
}

fn expiry_after(expires_in_secs: i64) -> ProviderResult<DateTime<Utc>> {
    if expires_in_secs <= 0 {
        return Err(AuthError::Parse(format!(
            "non-positive expires_in {}",
            expires_in_secs
        )));
    }

    Duration::try_seconds(expires_in_secs)
        .and_then(|lifetime| Utc::now().checked_add_signed(lifetime))
        .ok_or_else(|| AuthError::Parse(format!("expires_in {} out of range", expires_in_secs)))
}

// Tokens are secrets; keep them out of debug output.
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("token_type", &self.token_type)
            .field("expiry", &self.expiry)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Storage for token records.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Look up a token by its access token value.
    async fn get(&self, access_token: &str) -> ProviderResult<Option<Token>>;

    /// Insert or replace a token keyed by its access token value.
    async fn save(&self, token: &Token) -> ProviderResult<()>;
}

/// In-memory token store.
///
/// Suitable for single-process deployments and tests.
#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<String, Token>>,
}

impl std::fmt::Debug for MemoryTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTokenStore").finish_non_exhaustive()
    }
}

impl MemoryTokenStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens.
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    /// Check if the store holds no tokens.
    pub async fn is_empty(&self) -> bool {
        self.tokens.read().await.is_empty()
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    #[instrument(skip_all)]
    async fn get(&self, access_token: &str) -> ProviderResult<Option<Token>> {
        Ok(self.tokens.read().await.get(access_token).cloned())
    }

    #[instrument(skip_all, fields(email = %token.email))]
    async fn save(&self, token: &Token) -> ProviderResult<()> {
        let replaced = self
            .tokens
            .write()
            .await
            .insert(token.access_token.clone(), token.clone())
            .is_some();
        debug!(replaced, "Token saved");
        Ok(())
    }
}
