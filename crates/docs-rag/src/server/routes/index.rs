//! Index administration endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::error::Result;
use crate::index::{IndexInfo, VectorIndex};
use crate::server::state::AppState;

/// Description of the loaded index
#[derive(Debug, Serialize)]
pub struct IndexSummary {
    /// Number of chunks
    pub chunks: usize,
    /// Build-time facts
    #[serde(flatten)]
    pub info: IndexInfo,
}

impl From<&VectorIndex> for IndexSummary {
    fn from(index: &VectorIndex) -> Self {
        Self {
            chunks: index.len(),
            info: index.info().clone(),
        }
    }
}

/// GET /api/index
pub async fn index_info(State(state): State<AppState>) -> Result<Json<IndexSummary>> {
    let chain = state.chain()?;
    let index = chain.retriever().index().current();
    Ok(Json(IndexSummary::from(index.as_ref())))
}

/// POST /api/index/reload - swap in the index currently on disk
pub async fn reload_index(State(state): State<AppState>) -> Result<Json<IndexSummary>> {
    let chain = state.chain()?;
    let handle = chain.retriever().index();
    let previous = handle.reload().await?;

    let current = handle.current();
    tracing::info!(
        "Index reloaded: {} -> {} chunks",
        previous.len(),
        current.len()
    );
    Ok(Json(IndexSummary::from(current.as_ref())))
}
