//! OAuth 2.0 provider abstraction
//!
//! This module defines the capability set every identity provider offers
//! (authorization URL, code exchange, bearer revalidation) and a registry
//! that lets callers pick a provider by name without knowing its concrete type.

use crate::error::{AuthError, ProviderResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Supported OAuth providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum OAuthProvider {
    /// Google OAuth
    Google,
}

impl OAuthProvider {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            OAuthProvider::Google => "google",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "google" => Some(OAuthProvider::Google),
            _ => None,
        }
    }
}

impl std::fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A currently verified identity.
///
/// Returned by both [`OAuthProviderClient::exchange_code`] and
/// [`OAuthProviderClient::authenticate`]. Never persisted.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthResult {
    /// Access token the identity was verified with
    pub access_token: String,

    /// Email reported by the provider
    pub email: String,
}

impl std::fmt::Debug for AuthResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthResult")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// OAuth state for CSRF protection.
///
/// The provider echoes `state` back unmodified; callers compare it against
/// the value they stored before redirecting the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    /// Random state value
    pub state: String,

    /// Created timestamp
    pub created_at: i64,
}

impl OAuthState {
    /// Create a new OAuth state.
    pub fn new() -> Self {
        use rand::Rng;
        let state: String = rand::thread_rng()
            .sample_iter(&rand::distributions::Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();

        Self {
            state,
            created_at: chrono::Utc::now().timestamp(),
        }
    }

    /// Check if the state has expired (10 minutes).
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        now - self.created_at > 600
    }
}

impl Default for OAuthState {
    fn default() -> Self {
        Self::new()
    }
}

/// Trait for OAuth provider implementations.
#[async_trait]
pub trait OAuthProviderClient: Send + Sync {
    /// Which provider this client talks to.
    fn provider(&self) -> OAuthProvider;

    /// Build the authorization URL the user is redirected to.
    ///
    /// Pure: identical configuration and state always yield the same URL.
    fn build_auth_url(&self, state: &str) -> String;

    /// Exchange an authorization code for a verified identity.
    async fn exchange_code(&self, code: &str) -> ProviderResult<AuthResult>;

    /// Revalidate a previously issued access token.
    async fn authenticate(&self, access_token: &str) -> ProviderResult<AuthResult>;
}

/// Registry of configured providers.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<OAuthProvider, Arc<dyn OAuthProviderClient>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous client for the same provider.
    pub fn register(&mut self, client: Arc<dyn OAuthProviderClient>) -> &mut Self {
        self.providers.insert(client.provider(), client);
        self
    }

    /// Get the client for a provider.
    pub fn get(&self, provider: OAuthProvider) -> ProviderResult<Arc<dyn OAuthProviderClient>> {
        self.providers
            .get(&provider)
            .cloned()
            .ok_or_else(|| AuthError::Config(format!("provider {} is not registered", provider)))
    }

    /// Look up a client by provider name.
    pub fn get_by_name(&self, name: &str) -> ProviderResult<Arc<dyn OAuthProviderClient>> {
        let provider = OAuthProvider::parse(name)
            .ok_or_else(|| AuthError::Config(format!("unknown provider {}", name)))?;
        self.get(provider)
    }

    /// Registered providers, sorted by name.
    pub fn providers(&self) -> Vec<OAuthProvider> {
        let mut providers: Vec<_> = self.providers.keys().copied().collect();
        providers.sort_by_key(|p| p.as_str());
        providers
    }
}
