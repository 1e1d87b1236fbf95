//! Tag repository implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row};
use tracing::info;

use mindspace_core::validation::MSG_TAG_NAME_TAKEN;
use mindspace_core::{validate_tag_name, Error, Result, Tag, TagId, TagRepository};

use crate::unique_violation;

/// PostgreSQL implementation of TagRepository.
#[derive(Clone)]
pub struct PgTagRepository {
    pool: Pool<Postgres>,
}

impl PgTagRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn map_row(row: PgRow) -> Tag {
        Tag {
            id: row.get("id"),
            name: row.get("name"),
            created_at: row.get("created_at"),
        }
    }

    fn map_write_error(err: sqlx::Error) -> Error {
        match unique_violation(&err) {
            Some("tag_name_key") => Error::invalid("name", MSG_TAG_NAME_TAKEN),
            _ => Error::Database(err),
        }
    }

    fn not_found(id: TagId) -> Error {
        Error::NotFound(format!("Tag {} not found", id))
    }
}

#[async_trait]
impl TagRepository for PgTagRepository {
    async fn list(&self) -> Result<Vec<Tag>> {
        let rows = sqlx::query("SELECT id, name, created_at FROM tag ORDER BY name, id")
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(rows.into_iter().map(Self::map_row).collect())
    }

    async fn get(&self, id: TagId) -> Result<Tag> {
        sqlx::query("SELECT id, name, created_at FROM tag WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .map(Self::map_row)
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, name: &str) -> Result<Tag> {
        validate_tag_name(name)?;

        let row = sqlx::query(
            "INSERT INTO tag (name, created_at) VALUES ($1, $2) RETURNING id, name, created_at",
        )
        .bind(name.trim())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(Self::map_write_error)?;

        let tag = Self::map_row(row);
        info!(
            subsystem = "tags",
            component = "repository",
            op = "create",
            tag_id = tag.id,
            "Tag created"
        );
        Ok(tag)
    }

    async fn rename(&self, id: TagId, name: &str) -> Result<Tag> {
        validate_tag_name(name)?;

        sqlx::query("UPDATE tag SET name = $1 WHERE id = $2 RETURNING id, name, created_at")
            .bind(name.trim())
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Self::map_write_error)?
            .map(Self::map_row)
            .ok_or_else(|| Self::not_found(id))
    }

    async fn delete(&self, id: TagId) -> Result<()> {
        // note_tag rows go with the tag through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(id));
        }
        info!(
            subsystem = "tags",
            component = "repository",
            op = "delete",
            tag_id = id,
            "Tag deleted"
        );
        Ok(())
    }
}
