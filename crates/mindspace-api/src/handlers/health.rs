//! Liveness endpoint.

use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;
use mindspace_db::log_pool_metrics;

/// `GET /health`
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    log_pool_metrics(state.db.pool());
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
