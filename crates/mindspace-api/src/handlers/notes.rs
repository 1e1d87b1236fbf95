//! Note handlers.
//!
//! Every handler is scoped to the authenticated caller: the repository only
//! ever sees the caller's id as `author_id`.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Deserializer};

use crate::{auth::AuthUser, error::ApiError, state::AppState};
use mindspace_core::validation::MSG_REQUIRED;
use mindspace_core::{
    CreateNoteRequest, ListNotesRequest, NoteDetail, NoteId, NoteRepository, NoteSummary, TagId,
    UpdateNoteRequest,
};

/// Distinguish an explicit `null` from an absent field.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[derive(Debug, Default, Deserialize)]
pub struct ListNotesQuery {
    pub q: Option<String>,
}

/// Writable note fields. Read-only fields sent by clients (`slug`,
/// `created_at`, `updated_at`, `author`, `children`) are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct NoteBody {
    pub title: Option<String>,
    pub content: Option<String>,
    /// `Some(None)` detaches the note from its parent.
    #[serde(default, deserialize_with = "deserialize_some")]
    pub parent: Option<Option<NoteId>>,
    pub tags: Option<Vec<TagId>>,
}

impl NoteBody {
    pub fn into_create(self) -> Result<CreateNoteRequest, ApiError> {
        let title = self
            .title
            .ok_or_else(|| ApiError::invalid("title", MSG_REQUIRED))?;
        Ok(CreateNoteRequest {
            title,
            content: self.content.unwrap_or_default(),
            parent: self.parent.flatten(),
            tags: self.tags.unwrap_or_default(),
        })
    }

    /// Full updates (PUT) require `title`; partial ones (PATCH) do not.
    pub fn into_update(self, partial: bool) -> Result<UpdateNoteRequest, ApiError> {
        if !partial && self.title.is_none() {
            return Err(ApiError::invalid("title", MSG_REQUIRED));
        }
        Ok(UpdateNoteRequest {
            title: self.title,
            content: self.content,
            parent: self.parent,
            tags: self.tags,
        })
    }
}

/// `GET /api/notes?q=`
pub async fn list_notes(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<ListNotesQuery>,
) -> Result<Json<Vec<NoteSummary>>, ApiError> {
    let notes = state
        .db
        .notes
        .list(auth.user_id, ListNotesRequest { q: query.q })
        .await?;
    Ok(Json(notes))
}

/// `POST /api/notes`
pub async fn create_note(
    auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<NoteBody>, JsonRejection>,
) -> Result<(StatusCode, Json<NoteDetail>), ApiError> {
    let Json(body) = body?;
    let note = state
        .db
        .notes
        .create(auth.user_id, body.into_create()?)
        .await?;
    Ok((StatusCode::CREATED, Json(note)))
}

/// `GET /api/notes/:id`
pub async fn get_note(
    auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<NoteId>, PathRejection>,
) -> Result<Json<NoteDetail>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.db.notes.fetch(auth.user_id, id).await?))
}

async fn apply_update(
    auth: AuthUser,
    state: AppState,
    path: Result<Path<NoteId>, PathRejection>,
    body: Result<Json<NoteBody>, JsonRejection>,
    partial: bool,
) -> Result<Json<NoteDetail>, ApiError> {
    let Path(id) = path?;
    let Json(body) = body?;
    let note = state
        .db
        .notes
        .update(auth.user_id, id, body.into_update(partial)?)
        .await?;
    Ok(Json(note))
}

/// `PUT /api/notes/:id`
pub async fn update_note(
    auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<NoteId>, PathRejection>,
    body: Result<Json<NoteBody>, JsonRejection>,
) -> Result<Json<NoteDetail>, ApiError> {
    apply_update(auth, state, path, body, false).await
}

/// `PATCH /api/notes/:id`
pub async fn patch_note(
    auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<NoteId>, PathRejection>,
    body: Result<Json<NoteBody>, JsonRejection>,
) -> Result<Json<NoteDetail>, ApiError> {
    apply_update(auth, state, path, body, true).await
}

/// `DELETE /api/notes/:id`
pub async fn delete_note(
    auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<NoteId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.db.notes.delete(auth.user_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
