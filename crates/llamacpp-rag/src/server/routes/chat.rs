//! Simple question endpoint

use axum::{
    extract::{Query, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ChatParams, ChatResponse};

/// GET /api/chat?q= - Answer a question with default retrieval settings
pub async fn chat(
    State(state): State<AppState>,
    Query(params): Query<ChatParams>,
) -> Result<Json<ChatResponse>> {
    let question = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| Error::bad_request("Missing required query parameter 'q'"))?;

    let answer = state.chat().ask(&question).await?;
    Ok(Json(ChatResponse { question, answer }))
}
