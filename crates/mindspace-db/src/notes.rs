//! Note repository implementation.
//!
//! Every query is scoped by `author_id`; another user's note behaves exactly
//! like a missing one.

use std::collections::{BTreeSet, HashMap};
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::{debug, info, warn};

use mindspace_core::{
    assemble_children, derive_slug, validate_note_title, CreateNoteRequest, Error,
    ListNotesRequest, Note, NoteDetail, NoteId, NoteRepository, NoteSummary, NoteTreeNode, Result,
    Tag, TagId, TreeEntry, UpdateNoteRequest, UserId, DEFAULT_MAX_TREE_DEPTH,
};

use crate::escape_like;

const NOTE_COLUMNS: &str =
    "n.id, n.author_id, n.title, n.slug, n.content, n.parent_id, n.created_at, n.updated_at";

pub const MSG_PARENT_CYCLE: &str = "A note cannot be its own ancestor.";

fn msg_does_not_exist(id: i64) -> String {
    format!("Invalid pk \"{}\" - object does not exist.", id)
}

fn map_note(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        author_id: row.get("author_id"),
        title: row.get("title"),
        slug: row.get("slug"),
        content: row.get("content"),
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Levels the subtree query walks: one past the cap so truncation can be
/// reported, clamped to the range of a Postgres `integer`.
fn subtree_fetch_depth(max_tree_depth: usize) -> i32 {
    i32::try_from(max_tree_depth.saturating_add(1)).unwrap_or(i32::MAX)
}

fn not_found(id: NoteId) -> Error {
    Error::NotFound(format!("Note {} not found", id))
}

/// PostgreSQL implementation of NoteRepository.
#[derive(Clone)]
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
    max_tree_depth: usize,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            pool,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }

    /// Cap how many levels of children a detail view nests.
    pub fn with_max_tree_depth(mut self, depth: usize) -> Self {
        self.max_tree_depth = depth.max(1);
        self
    }

    pub fn max_tree_depth(&self) -> usize {
        self.max_tree_depth
    }

    /// Tags of each note in `ids`, ordered by name.
    async fn tags_for_notes_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        ids: &[NoteId],
    ) -> Result<HashMap<NoteId, Vec<Tag>>> {
        let mut by_note: HashMap<NoteId, Vec<Tag>> = HashMap::new();
        if ids.is_empty() {
            return Ok(by_note);
        }

        let rows = sqlx::query(
            r#"SELECT nt.note_id, t.id, t.name, t.created_at
               FROM note_tag nt
               JOIN tag t ON t.id = nt.tag_id
               WHERE nt.note_id = ANY($1)
               ORDER BY t.name, t.id"#,
        )
        .bind(ids)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        for row in rows {
            by_note.entry(row.get("note_id")).or_default().push(Tag {
                id: row.get("id"),
                name: row.get("name"),
                created_at: row.get("created_at"),
            });
        }
        Ok(by_note)
    }

    async fn find_owned_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        author_id: UserId,
        id: NoteId,
        for_update: bool,
    ) -> Result<Note> {
        let lock = if for_update { " FOR UPDATE" } else { "" };
        let row = sqlx::query(&format!(
            "SELECT {} FROM note n WHERE n.id = $1 AND n.author_id = $2{}",
            NOTE_COLUMNS, lock
        ))
        .bind(id)
        .bind(author_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?
        .ok_or_else(|| not_found(id))?;
        Ok(map_note(&row))
    }

    /// Load the nested children of `root`, bounded by the configured depth.
    async fn load_children_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        root: &Note,
    ) -> Result<Vec<NoteTreeNode>> {
        let fetch_depth = subtree_fetch_depth(self.max_tree_depth);

        let rows = sqlx::query(
            r#"WITH RECURSIVE subtree AS (
                   SELECT n.*, 1 AS depth
                   FROM note n
                   WHERE n.parent_id = $1 AND n.author_id = $2
                 UNION ALL
                   SELECT c.*, s.depth + 1
                   FROM note c
                   JOIN subtree s ON c.parent_id = s.id
                   WHERE s.depth < $3 AND c.author_id = $2
               )
               SELECT id, author_id, title, slug, content, parent_id, created_at, updated_at, depth
               FROM subtree
               ORDER BY depth, updated_at DESC, id DESC"#,
        )
        .bind(root.id)
        .bind(root.author_id)
        .bind(fetch_depth)
        .fetch_all(&mut **tx)
        .await
        .map_err(Error::Database)?;

        let ids: Vec<NoteId> = rows.iter().map(|r| r.get("id")).collect();
        let mut tags = self.tags_for_notes_tx(tx, &ids).await?;

        let entries = rows
            .iter()
            .map(|row| {
                let note = map_note(row);
                let depth: i32 = row.get("depth");
                TreeEntry {
                    note: NoteSummary::from_note(&note, tags.remove(&note.id).unwrap_or_default()),
                    depth: depth as usize,
                }
            })
            .collect();

        let tree = assemble_children(root.id, entries, self.max_tree_depth)?;
        if tree.truncated {
            warn!(
                subsystem = "notes",
                component = "tree",
                note_id = root.id,
                max_depth = self.max_tree_depth,
                "Note hierarchy deeper than the nesting cap; deeper children omitted"
            );
        }
        Ok(tree.children)
    }

    /// Fetch one note with tags and nested children within a transaction.
    pub async fn fetch_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        author_id: UserId,
        id: NoteId,
    ) -> Result<NoteDetail> {
        let note = self.find_owned_tx(tx, author_id, id, false).await?;
        let tags = self
            .tags_for_notes_tx(tx, &[note.id])
            .await?
            .remove(&note.id)
            .unwrap_or_default();
        let children = self.load_children_tx(tx, &note).await?;
        Ok(NoteDetail::new(note, tags, children))
    }

    /// List the author's notes within a transaction.
    pub async fn list_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        author_id: UserId,
        req: ListNotesRequest,
    ) -> Result<Vec<NoteSummary>> {
        let start = Instant::now();
        let keyword = req.keyword().map(|q| format!("%{}%", escape_like(q)));

        let mut query = format!("SELECT {} FROM note n WHERE n.author_id = $1", NOTE_COLUMNS);
        if keyword.is_some() {
            // EXISTS keeps each note once however many of its tags match.
            query.push_str(
                r#" AND (
                    n.title ILIKE $2 ESCAPE '\'
                    OR n.content ILIKE $2 ESCAPE '\'
                    OR EXISTS (
                        SELECT 1 FROM note_tag nt
                        JOIN tag t ON t.id = nt.tag_id
                        WHERE nt.note_id = n.id AND t.name ILIKE $2 ESCAPE '\'
                    )
                )"#,
            );
        }
        query.push_str(" ORDER BY n.updated_at DESC, n.id DESC");

        let mut q = sqlx::query(&query).bind(author_id);
        if let Some(pattern) = &keyword {
            q = q.bind(pattern);
        }
        let rows = q.fetch_all(&mut **tx).await.map_err(Error::Database)?;

        let notes: Vec<Note> = rows.iter().map(map_note).collect();
        let ids: Vec<NoteId> = notes.iter().map(|n| n.id).collect();
        let mut tags = self.tags_for_notes_tx(tx, &ids).await?;

        let summaries: Vec<NoteSummary> = notes
            .iter()
            .map(|note| NoteSummary::from_note(note, tags.remove(&note.id).unwrap_or_default()))
            .collect();

        debug!(
            subsystem = "notes",
            component = "repository",
            op = "list",
            user_id = author_id,
            has_query = keyword.is_some(),
            result_count = summaries.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Listed notes"
        );
        Ok(summaries)
    }

    /// Check that `parent` is one of the author's notes and, for an existing
    /// note, that it is not the note itself or one of its descendants.
    async fn check_parent_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        author_id: UserId,
        note_id: Option<NoteId>,
        parent: NoteId,
    ) -> Result<()> {
        let owned: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM note WHERE id = $1 AND author_id = $2)",
        )
        .bind(parent)
        .bind(author_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;
        if !owned {
            return Err(Error::invalid("parent", msg_does_not_exist(parent)));
        }

        let Some(note_id) = note_id else {
            return Ok(());
        };

        // UNION (not UNION ALL) stops the walk even if stored data already loops.
        let creates_cycle: bool = sqlx::query_scalar(
            r#"WITH RECURSIVE ancestors AS (
                   SELECT id, parent_id FROM note WHERE id = $1
                 UNION
                   SELECT n.id, n.parent_id
                   FROM note n
                   JOIN ancestors a ON n.id = a.parent_id
               )
               SELECT EXISTS(SELECT 1 FROM ancestors WHERE id = $2)"#,
        )
        .bind(parent)
        .bind(note_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if creates_cycle {
            return Err(Error::invalid("parent", MSG_PARENT_CYCLE));
        }
        Ok(())
    }

    /// Deduplicate `tags` and check that each exists.
    async fn check_tags_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        tags: &[TagId],
    ) -> Result<Vec<TagId>> {
        let wanted: Vec<TagId> = tags.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        if wanted.is_empty() {
            return Ok(wanted);
        }

        let found: Vec<TagId> = sqlx::query_scalar("SELECT id FROM tag WHERE id = ANY($1)")
            .bind(&wanted)
            .fetch_all(&mut **tx)
            .await
            .map_err(Error::Database)?;

        if let Some(missing) = wanted.iter().find(|id| !found.contains(id)) {
            return Err(Error::invalid("tags", msg_does_not_exist(*missing)));
        }
        Ok(wanted)
    }

    async fn replace_tags_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: NoteId,
        tags: &[TagId],
    ) -> Result<()> {
        sqlx::query("DELETE FROM note_tag WHERE note_id = $1")
            .bind(note_id)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;

        if !tags.is_empty() {
            sqlx::query("INSERT INTO note_tag (note_id, tag_id) SELECT $1, UNNEST($2::bigint[])")
                .bind(note_id)
                .bind(tags)
                .execute(&mut **tx)
                .await
                .map_err(Error::Database)?;
        }
        Ok(())
    }

    /// Create a note within a transaction.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        author_id: UserId,
        req: CreateNoteRequest,
    ) -> Result<NoteDetail> {
        validate_note_title(&req.title)?;
        let title = req.title.trim();

        if let Some(parent) = req.parent {
            self.check_parent_tx(tx, author_id, None, parent).await?;
        }
        let tags = self.check_tags_tx(tx, &req.tags).await?;

        let now = Utc::now();
        let slug = derive_slug(title, author_id, now);

        let id: NoteId = sqlx::query_scalar(
            r#"INSERT INTO note (author_id, title, slug, content, parent_id, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $6)
               RETURNING id"#,
        )
        .bind(author_id)
        .bind(title)
        .bind(&slug)
        .bind(&req.content)
        .bind(req.parent)
        .bind(now)
        .fetch_one(&mut **tx)
        .await
        .map_err(Error::Database)?;

        self.replace_tags_tx(tx, id, &tags).await?;
        self.fetch_tx(tx, author_id, id).await
    }

    /// Update a note within a transaction. The slug is never touched.
    pub async fn update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        author_id: UserId,
        id: NoteId,
        req: UpdateNoteRequest,
    ) -> Result<NoteDetail> {
        let current = self.find_owned_tx(tx, author_id, id, true).await?;

        let title = match &req.title {
            Some(title) => {
                validate_note_title(title)?;
                title.trim().to_string()
            }
            None => current.title,
        };
        let content = req.content.unwrap_or(current.content);

        let parent_id = match req.parent {
            Some(Some(parent)) => {
                self.check_parent_tx(tx, author_id, Some(id), parent).await?;
                Some(parent)
            }
            Some(None) => None,
            None => current.parent_id,
        };

        let tags = match &req.tags {
            Some(tags) => Some(self.check_tags_tx(tx, tags).await?),
            None => None,
        };

        sqlx::query(
            "UPDATE note SET title = $1, content = $2, parent_id = $3, updated_at = $4 WHERE id = $5",
        )
        .bind(&title)
        .bind(&content)
        .bind(parent_id)
        .bind(Utc::now())
        .bind(id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        if let Some(tags) = tags {
            self.replace_tags_tx(tx, id, &tags).await?;
        }
        self.fetch_tx(tx, author_id, id).await
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn list(&self, author_id: UserId, req: ListNotesRequest) -> Result<Vec<NoteSummary>> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.list_tx(&mut tx, author_id, req).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn fetch(&self, author_id: UserId, id: NoteId) -> Result<NoteDetail> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let result = self.fetch_tx(&mut tx, author_id, id).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(result)
    }

    async fn create(&self, author_id: UserId, req: CreateNoteRequest) -> Result<NoteDetail> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.create_tx(&mut tx, author_id, req).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "notes",
            component = "repository",
            op = "create",
            user_id = author_id,
            note_id = note.id,
            "Note created"
        );
        Ok(note)
    }

    async fn update(
        &self,
        author_id: UserId,
        id: NoteId,
        req: UpdateNoteRequest,
    ) -> Result<NoteDetail> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let note = self.update_tx(&mut tx, author_id, id, req).await?;
        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "notes",
            component = "repository",
            op = "update",
            user_id = author_id,
            note_id = id,
            "Note updated"
        );
        Ok(note)
    }

    async fn delete(&self, author_id: UserId, id: NoteId) -> Result<()> {
        // Descendants and note_tag rows follow through ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM note WHERE id = $1 AND author_id = $2")
            .bind(id)
            .bind(author_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(not_found(id));
        }
        info!(
            subsystem = "notes",
            component = "repository",
            op = "delete",
            user_id = author_id,
            note_id = id,
            "Note deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_does_not_exist_message() {
        assert_eq!(msg_does_not_exist(42), "Invalid pk \"42\" - object does not exist.");
    }

    #[test]
    fn test_subtree_fetch_depth_saturates() {
        assert_eq!(subtree_fetch_depth(32), 33);
        assert_eq!(subtree_fetch_depth(usize::MAX), i32::MAX);
        assert_eq!(subtree_fetch_depth(i32::MAX as usize), i32::MAX);
    }

    #[tokio::test]
    async fn test_tree_depth_floor() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap();
        let repo = PgNoteRepository::new(pool);
        assert_eq!(repo.max_tree_depth(), DEFAULT_MAX_TREE_DEPTH);
        assert_eq!(repo.with_max_tree_depth(0).max_tree_depth(), 1);
    }
}
