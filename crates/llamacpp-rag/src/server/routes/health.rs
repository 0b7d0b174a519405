//! Component health endpoint

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::server::state::AppState;

/// `UP` or `DOWN`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Up,
    Down,
}

impl From<bool> for HealthStatus {
    fn from(up: bool) -> Self {
        if up {
            Self::Up
        } else {
            Self::Down
        }
    }
}

/// Body of `GET /api/health`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub vector_store: HealthStatus,
    pub embeddings: HealthStatus,
    pub llm: HealthStatus,
}

/// GET /api/health - Check every backend concurrently
pub async fn component_health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (vector_store, embeddings, llm) = tokio::join!(
        state.vector_store().health_check(),
        state.embedder().health_check(),
        state.llm().health_check(),
    );

    let vector_store = HealthStatus::from(vector_store.unwrap_or(false));
    let embeddings = HealthStatus::from(embeddings.unwrap_or(false));
    let llm = HealthStatus::from(llm.unwrap_or(false));

    let all_up = [vector_store, embeddings, llm]
        .iter()
        .all(|s| *s == HealthStatus::Up);
    if !all_up {
        tracing::warn!(?vector_store, ?embeddings, ?llm, "Component health check failed");
    }

    let status = if all_up {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(HealthResponse {
            status: all_up.into(),
            vector_store,
            embeddings,
            llm,
        }),
    )
}
