//! Request middleware.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{error::ApiError, state::AppState};

/// Reject requests once the global rate limit is exhausted.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Some(limiter) = &state.rate_limiter {
        if limiter.check().is_err() {
            tracing::warn!(
                subsystem = "api",
                component = "rate_limit",
                path = %request.uri().path(),
                "Rate limit exceeded"
            );
            return Err(ApiError::TooManyRequests);
        }
    }
    Ok(next.run(request).await)
}
