//! API routes for the RAG server

pub mod cache;
pub mod chat;
pub mod health;
pub mod ingest;
pub mod query;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::component_health))
        // Ingestion
        .route("/ingest", post(ingest::ingest_folder))
        .route(
            "/ingest/upload",
            post(ingest::ingest_upload).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        // Question answering
        .route("/chat", get(chat::chat))
        .route("/query", post(query::query_rag))
        // Answer cache
        .route("/cache/stats", get(cache::cache_stats))
        .route("/cache", delete(cache::clear_cache))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "llamacpp-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Retrieval-augmented question answering over local documents with llama.cpp and pgvector",
        "endpoints": {
            "GET /api/health": "Component health (vector store, embeddings, llm)",
            "POST /api/ingest": "Ingest the configured data directory",
            "POST /api/ingest/upload": "Upload and ingest files (multipart)",
            "GET /api/chat?q=": "Ask a question",
            "POST /api/query": "Ask a question with retrieval options; returns sources",
            "GET /api/cache/stats": "Answer cache statistics",
            "DELETE /api/cache": "Clear the answer cache"
        }
    }))
}
