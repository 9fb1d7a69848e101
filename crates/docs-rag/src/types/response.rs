//! Retrieval and answer types

use serde::{Deserialize, Serialize};

use super::document::Chunk;
use super::event::CitedSource;

/// A retrieved chunk with its similarity to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is more similar)
    pub similarity: f32,
}

/// Chunks ranked by descending similarity, at most k long
pub type RetrievalResult = Vec<ScoredChunk>;

/// Response from a one-shot RAG query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Deduplicated sources of the retrieved context
    pub sources: Vec<CitedSource>,
    /// Number of chunks placed in the prompt
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// Build a response from the answer and the context it was generated from
    pub fn new(answer: String, context: &[ScoredChunk], processing_time_ms: u64) -> Self {
        Self {
            answer,
            sources: CitedSource::dedup(context.iter().map(|r| CitedSource::from(&r.chunk))),
            chunks_retrieved: context.len(),
            processing_time_ms,
        }
    }
}
