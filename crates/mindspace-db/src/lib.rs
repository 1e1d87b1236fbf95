//! # mindspace-db
//!
//! PostgreSQL database layer for mindspace.
//!
//! This crate provides:
//! - Connection pool management
//! - Repository implementations for users, tokens, tags and notes
//! - Schema migrations
//!
//! ## Example
//!
//! ```rust,ignore
//! use mindspace_db::{CreateNoteRequest, Database, NoteRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/mindspace").await?;
//!     db.migrate().await?;
//!
//!     let note = db.notes.create(1, CreateNoteRequest {
//!         title: "Recipes".to_string(),
//!         ..Default::default()
//!     }).await?;
//!
//!     println!("Created note: {}", note.slug);
//!     Ok(())
//! }
//! ```
pub mod notes;
pub mod pool;
pub mod tags;
pub mod tokens;
pub mod users;

// Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL.
pub mod test_fixtures;

// Re-export core types
pub use mindspace_core::*;

pub use notes::PgNoteRepository;
pub use pool::{create_lazy_pool, create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use tags::PgTagRepository;
pub use tokens::PgTokenRepository;
pub use users::PgUserRepository;

/// Escape LIKE/ILIKE wildcard characters (`%`, `_`, `\`) in user input.
pub fn escape_like(input: &str) -> String {
    input
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

/// Name of the violated constraint when `err` is a unique violation.
pub(crate) fn unique_violation(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => db.constraint(),
        _ => None,
    }
}

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub users: PgUserRepository,
    pub tokens: PgTokenRepository,
    pub tags: PgTagRepository,
    pub notes: PgNoteRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            users: PgUserRepository::new(pool.clone()),
            tokens: PgTokenRepository::new(pool.clone()),
            tags: PgTagRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            pool,
        }
    }

    /// Override access and refresh token lifetimes.
    pub fn with_token_lifetimes(
        mut self,
        access_ttl: chrono::Duration,
        refresh_ttl: chrono::Duration,
    ) -> Self {
        self.tokens = self.tokens.with_lifetimes(access_ttl, refresh_ttl);
        self
    }

    /// Cap the nesting depth of note detail views.
    pub fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.notes = self.notes.with_max_tree_depth(depth);
        self
    }

    /// Create a new Database instance by connecting to the given URL.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Create with custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
