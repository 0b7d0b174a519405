//! Query endpoint with retrieval options and sources

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// POST /api/query - Answer a question and return the chunks it used
pub async fn query_rag(
    State(state): State<AppState>,
    body: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let Json(request) = body.map_err(|rejection| Error::bad_request(rejection.body_text()))?;
    let response = state.chat().query(request).await?;
    tracing::info!(
        sources = response.sources.len(),
        cached = response.cached,
        "Query answered in {} ms",
        response.processing_time_ms
    );
    Ok(Json(response))
}
