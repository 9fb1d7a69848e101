//! Query-time retrieval: embed the question, search the index

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::index::IndexHandle;
use crate::providers::SharedEmbedder;
use crate::types::RetrievalResult;

/// Retrieves the chunks most similar to a question
pub struct Retriever {
    index: Arc<IndexHandle>,
    embedder: SharedEmbedder,
    default_k: usize,
}

impl Retriever {
    /// Create a retriever; the index must have been built by `embedder`
    pub fn new(index: Arc<IndexHandle>, embedder: SharedEmbedder, default_k: usize) -> Result<Self> {
        if default_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than 0"));
        }
        index
            .current()
            .ensure_compatible(&embedder.model_id(), embedder.dimensions())?;

        Ok(Self {
            index,
            embedder,
            default_k,
        })
    }

    /// Number of chunks returned when the caller does not ask for a specific k
    pub fn default_k(&self) -> usize {
        self.default_k
    }

    /// The index being searched
    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    /// Top-k chunks for `question`, most similar first
    pub async fn retrieve(&self, question: &str, k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::input("k must be greater than 0"));
        }

        let start = Instant::now();
        let embedding = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| Error::retrieval(format!("Failed to embed question: {}", e)))?;

        // Snapshot taken after embedding; a concurrent reload affects the next query only
        let index = self.index.current();
        let results = index.query(&embedding, k)?;

        tracing::debug!(
            "Retrieved {} of {} chunks in {:?}",
            results.len(),
            index.len(),
            start.elapsed()
        );
        Ok(results)
    }

    /// Retrieve with the configured default k
    pub async fn retrieve_default(&self, question: &str) -> Result<RetrievalResult> {
        self.retrieve(question, self.default_k).await
    }
}
