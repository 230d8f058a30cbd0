//! PostgreSQL token store
//!
//! Expects a table shaped like:
//!
//! ```sql
//! CREATE TABLE oauth2_tokens (
//!     access_token  TEXT PRIMARY KEY,
//!     refresh_token TEXT,
//!     token_type    TEXT NOT NULL,
//!     expiry        TIMESTAMPTZ NOT NULL,
//!     email         TEXT NOT NULL
//! );
//! ```
//!
//! Migrations are owned by the embedding service.

use crate::error::ProviderResult;
use crate::token::{Token, TokenStore};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use tracing::{debug, instrument};

#[derive(FromRow)]
struct TokenRow {
    access_token: String,
    refresh_token: Option<String>,
    token_type: String,
    expiry: DateTime<Utc>,
    email: String,
}

impl From<TokenRow> for Token {
    fn from(row: TokenRow) -> Self {
        Self {
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            token_type: row.token_type,
            expiry: row.expiry,
            email: row.email,
        }
    }
}

/// Token store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    /// Wrap an existing connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    #[instrument(skip_all)]
    async fn get(&self, access_token: &str) -> ProviderResult<Option<Token>> {
        let row = sqlx::query_as::<_, TokenRow>(
            r#"
            SELECT access_token, refresh_token, token_type, expiry, email
            FROM oauth2_tokens
            WHERE access_token = $1
            "#,
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Token::from))
    }

    #[instrument(skip_all, fields(email = %token.email))]
    async fn save(&self, token: &Token) -> ProviderResult<()> {
        sqlx::query(
            r#"
            INSERT INTO oauth2_tokens (access_token, refresh_token, token_type, expiry, email)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (access_token) DO UPDATE
            SET refresh_token = EXCLUDED.refresh_token,
                token_type = EXCLUDED.token_type,
                expiry = EXCLUDED.expiry,
                email = EXCLUDED.email
            "#,
        )
        .bind(&token.access_token)
        .bind(&token.refresh_token)
        .bind(&token.token_type)
        .bind(token.expiry)
        .bind(&token.email)
        .execute(&self.pool)
        .await?;

        debug!("Token saved");
        Ok(())
    }
}
