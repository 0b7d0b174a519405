//! Answer cache endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::server::state::AppState;
use crate::types::CacheStatsResponse;

/// GET /api/cache/stats
pub async fn cache_stats(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(state.answer_cache().stats())
}

/// DELETE /api/cache - Drop every cached answer
pub async fn clear_cache(State(state): State<AppState>) -> StatusCode {
    state.answer_cache().invalidate_all();
    StatusCode::NO_CONTENT
}
