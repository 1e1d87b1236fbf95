//! Registration and token handlers.

use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};
use serde::Deserialize;
use tracing::info;

use crate::{error::ApiError, state::AppState};
use mindspace_core::validation::{MSG_BLANK, MSG_REQUIRED};
use mindspace_core::{
    AccessToken, RegisterRequest, TokenPair, TokenRepository, UserRepository, UserSummary,
    ValidationErrors,
};

pub const MSG_NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenObtainBody {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TokenRefreshBody {
    pub refresh: Option<String>,
}

/// Check that a credential field is present and non-blank.
fn require<'a>(errors: &mut ValidationErrors, field: &str, value: &'a Option<String>) -> &'a str {
    match value.as_deref() {
        None => {
            errors.add(field, MSG_REQUIRED);
            ""
        }
        Some(v) if v.trim().is_empty() => {
            errors.add(field, MSG_BLANK);
            ""
        }
        Some(v) => v,
    }
}

/// `POST /api/register`
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let Json(req) = body?;
    let user = state.db.users.register(req).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// `POST /api/token`
pub async fn obtain_token(
    State(state): State<AppState>,
    body: Result<Json<TokenObtainBody>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let Json(body) = body?;
    let mut errors = ValidationErrors::new();
    let username = require(&mut errors, "username", &body.username);
    let password = require(&mut errors, "password", &body.password);
    errors.into_result()?;

    let user = state
        .db
        .users
        .verify_credentials(username, password)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(MSG_NO_ACTIVE_ACCOUNT.to_string()))?;

    let pair = state.db.tokens.issue(user.id).await?;
    info!(
        subsystem = "auth",
        component = "login",
        user_id = user.id,
        "User logged in"
    );
    Ok(Json(pair))
}

/// `POST /api/token/refresh`
pub async fn refresh_token(
    State(state): State<AppState>,
    body: Result<Json<TokenRefreshBody>, JsonRejection>,
) -> Result<Json<AccessToken>, ApiError> {
    let Json(body) = body?;
    let mut errors = ValidationErrors::new();
    let refresh = require(&mut errors, "refresh", &body.refresh);
    errors.into_result()?;

    let access = state.db.tokens.refresh(refresh).await?;
    Ok(Json(access))
}
