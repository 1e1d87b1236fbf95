//! User repository implementation.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::info;

use mindspace_core::validation::{MSG_EMAIL_TAKEN, MSG_USERNAME_TAKEN};
use mindspace_core::{
    hash_password, validate_registration, verify_password, Error, RegisterRequest, Result, User,
    UserRepository, UserSummary, ValidationErrors,
};

use crate::unique_violation;

const USER_COLUMNS: &str = "id, username, email, password_hash, is_staff, date_joined";

/// Hash checked when a login names an unknown user, so both paths cost one
/// Argon2 verification.
fn dummy_password_hash() -> &'static str {
    static DUMMY_HASH: OnceLock<String> = OnceLock::new();
    DUMMY_HASH.get_or_init(|| hash_password("mindspace-unknown-user").unwrap_or_default())
}

/// Run password hashing work on the blocking thread pool.
async fn run_blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("Password task failed: {}", e)))?
}

/// PostgreSQL implementation of UserRepository.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool<Postgres>,
}

impl PgUserRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> User {
        User {
            id: row.get("id"),
            username: row.get("username"),
            email: row.get("email"),
            password_hash: row.get("password_hash"),
            is_staff: row.get("is_staff"),
            date_joined: row.get("date_joined"),
        }
    }

    /// Map a unique violation on registration to the field it belongs to.
    fn map_insert_error(err: sqlx::Error) -> Error {
        match unique_violation(&err) {
            Some("app_user_username_key") => Error::invalid("username", MSG_USERNAME_TAKEN),
            Some("app_user_email_key") => Error::invalid("email", MSG_EMAIL_TAKEN),
            _ => Error::Database(err),
        }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn register(&self, req: RegisterRequest) -> Result<UserSummary> {
        validate_registration(&req)?;
        let email = req.normalized_email().map(str::to_string);

        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let mut errors = ValidationErrors::new();
        let username_taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE username = $1)")
                .bind(&req.username)
                .fetch_one(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if username_taken {
            errors.add("username", MSG_USERNAME_TAKEN);
        }
        if let Some(email) = &email {
            let email_taken: bool =
                sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM app_user WHERE email = $1)")
                    .bind(email)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
            if email_taken {
                errors.add("email", MSG_EMAIL_TAKEN);
            }
        }
        errors.into_result()?;

        let password = req.password.clone();
        let password_hash = run_blocking(move || hash_password(&password)).await?;
        let row = sqlx::query(&format!(
            "INSERT INTO app_user (username, email, password_hash, is_staff, date_joined)
             VALUES ($1, $2, $3, FALSE, $4)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(&req.username)
        .bind(&email)
        .bind(&password_hash)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await
        .map_err(Self::map_insert_error)?;

        tx.commit().await.map_err(Self::map_insert_error)?;

        let user = Self::map_row(row);
        info!(
            subsystem = "auth",
            component = "users",
            op = "register",
            user_id = user.id,
            "User registered"
        );
        Ok(UserSummary::from(&user))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM app_user WHERE username = $1",
            USER_COLUMNS
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;
        Ok(row.map(Self::map_row))
    }

    async fn verify_credentials(&self, username: &str, password: &str) -> Result<Option<User>> {
        let password = password.to_string();
        let Some(user) = self.find_by_username(username).await? else {
            run_blocking(move || {
                let _ = verify_password(&password, dummy_password_hash());
                Ok(())
            })
            .await?;
            return Ok(None);
        };

        let hash = user.password_hash.clone();
        let matches = run_blocking(move || verify_password(&password, &hash)).await?;
        Ok(matches.then_some(user))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_hash_is_argon2_and_rejects_input() {
        let hash = dummy_password_hash();
        assert!(hash.starts_with("$argon2id$"));
        assert!(!verify_password("correct-horse", hash).unwrap());
        assert_eq!(hash, dummy_password_hash());
    }

    #[tokio::test]
    async fn test_run_blocking_returns_result() {
        let hash = run_blocking(|| hash_password("secret1")).await.unwrap();
        let ok = run_blocking(move || verify_password("secret1", &hash)).await.unwrap();
        assert!(ok);
    }

    #[tokio::test]
    async fn test_run_blocking_propagates_error() {
        let result = run_blocking(|| verify_password("x", "not-a-phc-string")).await;
        assert!(matches!(result, Err(Error::Internal(_))));
    }
}
