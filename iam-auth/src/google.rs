//! Google OAuth 2.0 provider
//!
//! Implements the authorization code grant against Google's token and
//! userinfo endpoints:
//!
//! 1. POST the code to the token endpoint and decode the token response
//! 2. GET the userinfo endpoint with the new bearer token
//! 3. Enforce the hosted-domain allow-list
//! 4. Persist the token through the injected [`TokenStore`]
//!
//! Any failed step aborts the exchange. Already completed steps are not
//! rolled back, so a token rejected by policy or lost by the store still
//! exists at Google.

use crate::error::{AuthError, ProviderResult};
use crate::oauth::{AuthResult, OAuthProvider, OAuthProviderClient};
use crate::token::{Token, TokenStore};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Google authorization endpoint.
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Google userinfo endpoint.
pub const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Scopes requested on every authorization.
pub const SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Google provider configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// Client ID
    pub client_id: String,

    /// Client secret
    pub client_secret: String,

    /// Redirect URL registered with Google
    pub redirect_url: String,

    /// Allowed hosted domains; empty accepts every domain
    #[serde(default)]
    pub hosted_domains: Vec<String>,

    /// Authorization URL override
    #[serde(default)]
    pub auth_url: Option<String>,

    /// Token URL override
    #[serde(default)]
    pub token_url: Option<String>,

    /// Userinfo URL override
    #[serde(default)]
    pub userinfo_url: Option<String>,

    /// Timeout for each outbound request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl std::fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("redirect_url", &self.redirect_url)
            .field("hosted_domains", &self.hosted_domains)
            .field("auth_url", &self.auth_url)
            .field("token_url", &self.token_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GoogleConfig {
    /// Create a new Google configuration accepting every hosted domain.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        redirect_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_url: redirect_url.into(),
            hosted_domains: Vec::new(),
            auth_url: None,
            token_url: None,
            userinfo_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Restrict sign-in to the given hosted domains.
    pub fn with_hosted_domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosted_domains = domains.into_iter().map(Into::into).collect();
        self
    }

    /// Override the token and userinfo endpoints.
    pub fn with_endpoints(
        mut self,
        token_url: impl Into<String>,
        userinfo_url: impl Into<String>,
    ) -> Self {
        self.token_url = Some(token_url.into());
        self.userinfo_url = Some(userinfo_url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `GOOGLE_CLIENT_ID`: OAuth client ID (required)
    /// - `GOOGLE_CLIENT_SECRET`: OAuth client secret (required)
    /// - `GOOGLE_REDIRECT_URL`: Registered redirect URL (required)
    /// - `GOOGLE_HOSTED_DOMAINS`: Comma-separated allow-list (default: any domain)
    /// - `GOOGLE_TIMEOUT_SECS`: Request timeout in seconds (default: 10)
    pub fn from_env() -> ProviderResult<Self> {
        fn required(key: &str) -> ProviderResult<String> {
            std::env::var(key)
                .map_err(|_| AuthError::Config(format!("missing environment variable {}", key)))
        }

        let hosted_domains = std::env::var("GOOGLE_HOSTED_DOMAINS")
            .map(|s| parse_domain_list(&s))
            .unwrap_or_default();

        let timeout_secs = match std::env::var("GOOGLE_TIMEOUT_SECS") {
            Ok(raw) => raw.parse().map_err(|_| {
                AuthError::Config(format!("GOOGLE_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        let config = Self {
            hosted_domains,
            timeout_secs,
            ..Self::new(
                required("GOOGLE_CLIENT_ID")?,
                required("GOOGLE_CLIENT_SECRET")?,
                required("GOOGLE_REDIRECT_URL")?,
            )
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make every request fail.
    pub fn validate(&self) -> ProviderResult<()> {
        if self.timeout_secs == 0 {
            return Err(AuthError::Config(
                "timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Get the authorization URL.
    pub fn get_auth_url(&self) -> &str {
        self.auth_url.as_deref().unwrap_or(AUTH_ENDPOINT)
    }

    /// Get the token URL.
    pub fn get_token_url(&self) -> &str {
        self.token_url.as_deref().unwrap_or(TOKEN_ENDPOINT)
    }

    /// Get the userinfo URL.
    pub fn get_userinfo_url(&self) -> &str {
        self.userinfo_url.as_deref().unwrap_or(USERINFO_ENDPOINT)
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check a hosted domain against the allow-list.
    ///
    /// An empty allow-list accepts every domain, otherwise the match is exact
    /// and case-sensitive.
    pub fn is_domain_allowed(&self, hosted_domain: &str) -> bool {
        self.hosted_domains.is_empty() || self.hosted_domains.iter().any(|d| d == hosted_domain)
    }
}

fn parse_domain_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Token endpoint response.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    token_type: String,
    expires_in: i64,
}

/// Userinfo endpoint response.
#[derive(Debug, Deserialize)]
struct UserInfo {
    email: String,
    #[serde(default)]
    hd: Option<String>,
}

/// Google implementation of [`OAuthProviderClient`].
pub struct GoogleProvider {
    config: GoogleConfig,
    tokens: Arc<dyn TokenStore>,
    client: Client,
}

impl std::fmt::Debug for GoogleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl GoogleProvider {
    /// Create a provider with its own HTTP client bounded by the configured timeout.
    pub fn new(config: GoogleConfig, tokens: Arc<dyn TokenStore>) -> ProviderResult<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.timeout())
            .build()
            .map_err(|e| AuthError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self::with_client(config, tokens, client))
    }

    /// Create a provider sharing an existing HTTP client.
    ///
    /// The client's own timeout settings apply.
    pub fn with_client(config: GoogleConfig, tokens: Arc<dyn TokenStore>, client: Client) -> Self {
        Self {
            config,
            tokens,
            client,
        }
    }

    /// Provider configuration.
    pub fn config(&self) -> &GoogleConfig {
        &self.config
    }

    #[instrument(skip_all)]
    async fn token_from_code(&self, code: &str) -> ProviderResult<Token> {
        let form = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_url.as_str()),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .client
            .post(self.config.get_token_url())
            .form(&form)
            .send()
            .await?;

        let body: TokenResponse = decode(response, "token").await?;

        debug!(
            token_type = %body.token_type,
            expires_in = body.expires_in,
            has_refresh_token = body.refresh_token.is_some(),
            "Token endpoint returned token"
        );

        Token::issued_now(
            body.access_token,
            body.refresh_token,
            body.token_type,
            body.expires_in,
            String::new(),
        )
        .map_err(|e| match e {
            AuthError::Parse(msg) => AuthError::Parse(format!("invalid token response: {}", msg)),
            other => other,
        })
    }

    #[instrument(skip_all)]
    async fn user_info(&self, access_token: &str) -> ProviderResult<UserInfo> {
        let response = self
            .client
            .get(self.config.get_userinfo_url())
            .bearer_auth(access_token)
            .send()
            .await?;

        decode(response, "userinfo").await
    }

    fn check_hosted_domain(&self, info: &UserInfo) -> ProviderResult<()> {
        let domain = info.hd.as_deref().unwrap_or_default();
        if self.config.is_domain_allowed(domain) {
            return Ok(());
        }

        warn!(email = %info.email, hosted_domain = %domain, "Hosted domain not allowed");
        Err(AuthError::PolicyViolation {
            domain: domain.to_string(),
        })
    }
}

/// Check the status and decode a JSON body into `T`.
async fn decode<T>(response: reqwest::Response, endpoint: &str) -> ProviderResult<T>
where
    T: DeserializeOwned,
{
    let status = response.status();

    if !status.is_success() {
        let message = match response.text().await {
            Ok(body) => body,
            Err(e) => format!("failed to read response body: {}", e),
        };
        warn!(endpoint, status = status.as_u16(), "Provider rejected request");
        return Err(AuthError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.bytes().await?;
    serde_json::from_slice(&body)
        .map_err(|e| AuthError::Parse(format!("invalid {} response: {}", endpoint, e)))
}

#[async_trait]
impl OAuthProviderClient for GoogleProvider {
    fn provider(&self) -> OAuthProvider {
        OAuthProvider::Google
    }

    fn build_auth_url(&self, state: &str) -> String {
        let scope = SCOPES
            .iter()
            .map(|s| urlencoding::encode(s).into_owned())
            .collect::<Vec<_>>()
            .join("+");

        let params = [
            ("state", urlencoding::encode(state).into_owned()),
            (
                "redirect_uri",
                urlencoding::encode(&self.config.redirect_url).into_owned(),
            ),
            (
                "client_id",
                urlencoding::encode(&self.config.client_id).into_owned(),
            ),
            ("scope", scope),
            ("access_type", "offline".to_string()),
            ("include_granted_scopes", "true".to_string()),
            ("response_type", "code".to_string()),
            ("prompt", "consent".to_string()),
        ];

        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");

        format!("{}?{}", self.config.get_auth_url(), query)
    }

    #[instrument(skip_all, fields(provider = "google"))]
    async fn exchange_code(&self, code: &str) -> ProviderResult<AuthResult> {
        let mut token = self.token_from_code(code).await?;
        let info = self.user_info(&token.access_token).await?;
        self.check_hosted_domain(&info)?;

        token.email = info.email;
        self.tokens.save(&token).await?;

        info!(email = %token.email, "Authorization code exchanged");

        Ok(AuthResult {
            access_token: token.access_token,
            email: token.email,
        })
    }

    #[instrument(skip_all, fields(provider = "google"))]
    async fn authenticate(&self, access_token: &str) -> ProviderResult<AuthResult> {
        let token = self
            .tokens
            .get(access_token)
            .await?
            .ok_or_else(|| AuthError::NotFound("access token not found".to_string()))?;

        // Liveness probe only; the stored email is authoritative.
        // TODO: attempt a refresh_token grant when the probe is rejected.
        self.user_info(&token.access_token).await?;

        debug!(email = %token.email, "Access token revalidated");

        Ok(AuthResult {
            access_token: token.access_token,
            email: token.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;

    fn provider(domains: &[&str]) -> GoogleProvider {
        let config = GoogleConfig::new("client-1", "secret-1", "https://app.test/callback")
            .with_hosted_domains(domains.iter().copied());
        GoogleProvider::new(config, Arc::new(MemoryTokenStore::new())).unwrap()
    }

    fn query_value(url: &str, key: &str) -> Option<String> {
        reqwest::Url::parse(url)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    #[test]
    fn test_auth_url_is_deterministic() {
        let google = provider(&[]);
        assert_eq!(google.build_auth_url("abc"), google.build_auth_url("abc"));
        assert_ne!(google.build_auth_url("abc"), google.build_auth_url("abd"));
    }

    #[test]
    fn test_auth_url_parameters() {
        let google = provider(&[]);
        let url = google.build_auth_url("xyz");

        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert_eq!(query_value(&url, "state").as_deref(), Some("xyz"));
        assert_eq!(
            query_value(&url, "redirect_uri").as_deref(),
            Some("https://app.test/callback")
        );
        assert_eq!(query_value(&url, "client_id").as_deref(), Some("client-1"));
        assert_eq!(query_value(&url, "access_type").as_deref(), Some("offline"));
        assert_eq!(
            query_value(&url, "include_granted_scopes").as_deref(),
            Some("true")
        );
        assert_eq!(query_value(&url, "response_type").as_deref(), Some("code"));
        assert_eq!(query_value(&url, "prompt").as_deref(), Some("consent"));
        assert_eq!(
            query_value(&url, "scope").as_deref(),
            Some(
                "https://www.googleapis.com/auth/userinfo.profile \
                 https://www.googleapis.com/auth/userinfo.email"
            )
        );
        assert!(url.contains(
            "scope=https%3A%2F%2Fwww.googleapis.com%2Fauth%2Fuserinfo.profile+https%3A%2F%2F"
        ));
        assert!(!url.contains("secret-1"));
    }

    #[test]
    fn test_auth_url_preserves_state_with_reserved_chars() {
        let google = provider(&[]);
        let state = "a b&c=d+e/f?";
        let url = google.build_auth_url(state);
        assert_eq!(query_value(&url, "state").as_deref(), Some(state));
    }

    #[test]
    fn test_empty_allow_list_accepts_everything() {
        let google = provider(&[]);
        for hd in [Some("acme.com"), Some("other.com"), None] {
            let info = UserInfo {
                email: "a@x".to_string(),
                hd: hd.map(String::from),
            };
            assert!(google.check_hosted_domain(&info).is_ok());
        }
    }

    #[test]
    fn test_allow_list_exact_match() {
        let google = provider(&["acme.com"]);
        let allowed = UserInfo {
            email: "a@acme.com".to_string(),
            hd: Some("acme.com".to_string()),
        };
        assert!(google.check_hosted_domain(&allowed).is_ok());

        for hd in ["other.com", "ACME.com", "sub.acme.com"] {
            let info = UserInfo {
                email: "a@x".to_string(),
                hd: Some(hd.to_string()),
            };
            match google.check_hosted_domain(&info) {
                Err(AuthError::PolicyViolation { domain }) => assert_eq!(domain, hd),
                other => panic!("expected policy violation, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_allow_list_rejects_missing_domain() {
        let google = provider(&["acme.com"]);
        let info = UserInfo {
            email: "a@gmail.com".to_string(),
            hd: None,
        };
        assert!(matches!(
            google.check_hosted_domain(&info),
            Err(AuthError::PolicyViolation { .. })
        ));
    }

    #[test]
    fn test_config_endpoint_defaults() {
        let config = GoogleConfig::new("id", "secret", "https://app.test/cb");
        assert_eq!(config.get_token_url(), TOKEN_ENDPOINT);
        assert_eq!(config.get_userinfo_url(), USERINFO_ENDPOINT);
        assert_eq!(config.timeout(), Duration::from_secs(10));

        let config = config.with_endpoints("http://mock/token", "http://mock/userinfo");
        assert_eq!(config.get_token_url(), "http://mock/token");
        assert_eq!(config.get_userinfo_url(), "http://mock/userinfo");
    }

    #[test]
    fn test_config_debug_hides_secret() {
        let config = GoogleConfig::new("id", "very-secret", "https://app.test/cb");
        assert!(!format!("{:?}", config).contains("very-secret"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = GoogleConfig::new("id", "secret", "https://app.test/cb");
        config.timeout_secs = 0;
        assert!(matches!(config.validate(), Err(AuthError::Config(_))));

        let err = GoogleProvider::new(config, Arc::new(MemoryTokenStore::new())).unwrap_err();
        assert!(matches!(err, AuthError::Config(_)));
    }

    #[test]
    fn test_deserialized_zero_timeout_rejected() {
        let config: GoogleConfig = serde_json::from_value(serde_json::json!({
            "client_id": "id",
            "client_secret": "secret",
            "redirect_url": "https://app.test/cb",
            "timeout_secs": 0
        }))
        .unwrap();
        assert!(GoogleProvider::new(config, Arc::new(MemoryTokenStore::new())).is_err());
    }

    #[test]
    fn test_parse_domain_list() {
        assert_eq!(
            parse_domain_list(" acme.com, ,example.org "),
            vec!["acme.com".to_string(), "example.org".to_string()]
        );
        assert!(parse_domain_list("").is_empty());
    }

    #[test]
    fn test_config_deserialize_defaults() {
        let config: GoogleConfig = serde_json::from_value(serde_json::json!({
            "client_id": "id",
            "client_secret": "secret",
            "redirect_url": "https://app.test/cb"
        }))
        .unwrap();
        assert!(config.hosted_domains.is_empty());
        assert_eq!(config.timeout_secs, 10);
    }
}
