//! Bearer token authentication.

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};

use crate::{error::ApiError, state::AppState};
use mindspace_core::{TokenRepository, UserId};

pub const MSG_NOT_AUTHENTICATED: &str = "Authentication credentials were not provided.";
pub const MSG_TOKEN_NOT_VALID: &str = "Given token not valid for any token type";

/// The caller behind a valid access token.
///
/// Handlers that take this extractor reject anonymous requests with 401, and
/// pass `user_id` into every repository call that is scoped to an author.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub username: String,
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Unauthorized(MSG_NOT_AUTHENTICATED.to_string()))?;

        let token = bearer_token(header_value)
            .ok_or_else(|| ApiError::Unauthorized(MSG_NOT_AUTHENTICATED.to_string()))?;

        let owner = state
            .db
            .tokens
            .authenticate(token)
            .await?
            .ok_or_else(|| ApiError::Unauthorized(MSG_TOKEN_NOT_VALID.to_string()))?;

        Ok(AuthUser {
            user_id: owner.user_id,
            username: owner.username,
        })
    }
}
