//! Bearer token repository.
//!
//! Tokens are opaque random strings. Only their SHA-256 hashes are stored, so a
//! database dump cannot be replayed against the API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::{debug, info};

use mindspace_core::{AccessToken, Error, Result, TokenOwner, TokenPair, TokenRepository, UserId};

/// Prefix of access tokens.
pub const ACCESS_TOKEN_PREFIX: &str = "ms_at_";

/// Prefix of refresh tokens.
pub const REFRESH_TOKEN_PREFIX: &str = "ms_rt_";

/// Random characters after the prefix.
pub const TOKEN_SECRET_LEN: usize = 48;

/// Default access token lifetime (5 minutes).
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: i64 = 300;

/// Default refresh token lifetime (1 day).
pub const DEFAULT_REFRESH_TOKEN_TTL_SECS: i64 = 86_400;

pub const MSG_INVALID_TOKEN: &str = "Token is invalid or expired";

/// Generate a random alphanumeric string.
fn generate_secret(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

/// Hex-encoded SHA-256 of a token.
fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// PostgreSQL implementation of TokenRepository.
#[derive(Clone)]
pub struct PgTokenRepository {
    pool: Pool<Postgres>,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl PgTokenRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            access_ttl: Duration::seconds(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_ttl: Duration::seconds(DEFAULT_REFRESH_TOKEN_TTL_SECS),
        }
    }

    /// Override token lifetimes.
    pub fn with_lifetimes(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    fn new_access_token() -> String {
        format!("{}{}", ACCESS_TOKEN_PREFIX, generate_secret(TOKEN_SECRET_LEN))
    }

    fn new_refresh_token() -> String {
        format!("{}{}", REFRESH_TOKEN_PREFIX, generate_secret(TOKEN_SECRET_LEN))
    }

    /// Delete the user's rows whose refresh token has expired. Such rows can
    /// neither authenticate nor refresh.
    pub async fn prune_expired_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM auth_token WHERE user_id = $1 AND refresh_token_expires_at <= $2",
        )
        .bind(user_id)
        .bind(now)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl TokenRepository for PgTokenRepository {
    async fn issue(&self, user_id: UserId) -> Result<TokenPair> {
        let access = Self::new_access_token();
        let refresh = Self::new_refresh_token();
        let now = Utc::now();

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let pruned = self.prune_expired_tx(&mut tx, user_id, now).await?;

        sqlx::query(
            r#"INSERT INTO auth_token (
                user_id, access_token_hash, refresh_token_hash,
                access_token_expires_at, refresh_token_expires_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(user_id)
        .bind(hash_secret(&access))
        .bind(hash_secret(&refresh))
        .bind(now + self.access_ttl)
        .bind(now + self.refresh_ttl)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "auth",
            component = "tokens",
            op = "issue",
            user_id,
            pruned,
            "Issued token pair"
        );
        Ok(TokenPair { access, refresh })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AccessToken> {
        if !refresh_token.starts_with(REFRESH_TOKEN_PREFIX) {
            return Err(Error::Unauthorized(MSG_INVALID_TOKEN.to_string()));
        }
        let access = Self::new_access_token();
        let now = Utc::now();

        // The refresh token stays valid; only the access side of the row rotates.
        let row = sqlx::query(
            r#"UPDATE auth_token
               SET access_token_hash = $1, access_token_expires_at = $2, last_used_at = $3
               WHERE refresh_token_hash = $4
                 AND refresh_token_expires_at > $3
               RETURNING user_id"#,
        )
        .bind(hash_secret(&access))
        .bind(now + self.access_ttl)
        .bind(now)
        .bind(hash_secret(refresh_token))
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| Error::Unauthorized(MSG_INVALID_TOKEN.to_string()))?;

        let user_id: UserId = row.get("user_id");
        debug!(
            subsystem = "auth",
            component = "tokens",
            op = "refresh",
            user_id,
            "Refreshed access token"
        );
        Ok(AccessToken { access })
    }

    async fn authenticate(&self, access_token: &str) -> Result<Option<TokenOwner>> {
        if !access_token.starts_with(ACCESS_TOKEN_PREFIX) {
            return Ok(None);
        }
        let now = Utc::now();

        let row = sqlx::query(
            r#"UPDATE auth_token t
               SET last_used_at = $2
               FROM app_user u
               WHERE t.access_token_hash = $1
                 AND t.user_id = u.id
                 AND t.access_token_expires_at > $2
               RETURNING u.id, u.username"#,
        )
        .bind(hash_secret(access_token))
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|r| TokenOwner {
            user_id: r.get("id"),
            username: r.get("username"),
        }))
    }
}
