//! Tag handlers.
//!
//! Tags are shared by every user; any authenticated caller may manage them.

use axum::{
    extract::rejection::{JsonRejection, PathRejection},
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{auth::AuthUser, error::ApiError, state::AppState};
use mindspace_core::validation::MSG_REQUIRED;
use mindspace_core::{Tag, TagId, TagRepository};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TagBody {
    pub name: Option<String>,
}

impl TagBody {
    fn required_name(self) -> Result<String, ApiError> {
        self.name.ok_or_else(|| ApiError::invalid("name", MSG_REQUIRED))
    }
}

/// `GET /api/tags`
pub async fn list_tags(
    _auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Tag>>, ApiError> {
    Ok(Json(state.db.tags.list().await?))
}

/// `POST /api/tags`
pub async fn create_tag(
    _auth: AuthUser,
    State(state): State<AppState>,
    body: Result<Json<TagBody>, JsonRejection>,
) -> Result<(StatusCode, Json<Tag>), ApiError> {
    let Json(body) = body?;
    let tag = state.db.tags.create(&body.required_name()?).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}

/// `GET /api/tags/:id`
pub async fn get_tag(
    _auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<TagId>, PathRejection>,
) -> Result<Json<Tag>, ApiError> {
    let Path(id) = path?;
    Ok(Json(state.db.tags.get(id).await?))
}

/// `PUT /api/tags/:id`
pub async fn update_tag(
    _auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<TagId>, PathRejection>,
    body: Result<Json<TagBody>, JsonRejection>,
) -> Result<Json<Tag>, ApiError> {
    let Path(id) = path?;
    let Json(body) = body?;
    Ok(Json(state.db.tags.rename(id, &body.required_name()?).await?))
}

/// `PATCH /api/tags/:id`
pub async fn patch_tag(
    _auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<TagId>, PathRejection>,
    body: Result<Json<TagBody>, JsonRejection>,
) -> Result<Json<Tag>, ApiError> {
    let Path(id) = path?;
    let Json(body) = body?;
    let tag = match body.name {
        Some(name) => state.db.tags.rename(id, &name).await?,
        None => state.db.tags.get(id).await?,
    };
    Ok(Json(tag))
}

/// `DELETE /api/tags/:id`
pub async fn delete_tag(
    _auth: AuthUser,
    State(state): State<AppState>,
    path: Result<Path<TagId>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path?;
    state.db.tags.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
