//! API routes for the RAG server

pub mod index;
pub mod query;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Question answering
        .route("/chat", post(query::chat))
        .route("/query", post(query::query))
        // Index administration
        .route("/index", get(index::index_info))
        .route("/index/reload", post(index::reload_index))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<Value> {
    let config = state.config();
    Json(json!({
        "name": "docs-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": format!("{} documentation Q&A with streamed answers and source citations", config.prompt.domain),
        "ready": state.is_ready(),
        "backend": config.backend,
        "embedding_model": config.embedding_model_id(),
        "top_k": config.retrieval.top_k,
        "endpoints": {
            "POST /api/chat": "Ask a question, answer streamed as Server-Sent Events",
            "POST /api/query": "Ask a question, answer returned as JSON",
            "GET /api/index": "Describe the loaded index",
            "POST /api/index/reload": "Reload the index from disk",
            "GET /health": "Liveness",
            "GET /ready": "Readiness"
        }
    }))
}
