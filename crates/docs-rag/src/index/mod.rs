//! In-memory vector index over embedded chunks
//!
//! An index is built once offline, persisted as a directory and loaded
//! read-only by the query service. Search is an exact cosine scan, which is
//! plenty for a single documentation site.

pub mod handle;
pub mod manifest;
pub mod similarity;
mod storage;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::{Chunk, RetrievalResult, ScoredChunk};

pub use handle::IndexHandle;
pub use manifest::{ChunkingParams, IndexInfo, IndexManifest, ENTRIES_FILE, MANIFEST_FILE};
pub use similarity::cosine_similarity;

/// A persisted chunk with its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// Sequential identifier (insertion order)
    pub id: u64,
    /// The chunk
    pub chunk: Chunk,
    /// Embedding of `chunk.text`
    pub embedding: Vec<f32>,
}

/// Immutable vector index
#[derive(Debug, Clone)]
pub struct VectorIndex {
    entries: Vec<IndexEntry>,
    info: IndexInfo,
}

impl VectorIndex {
    /// Embed every chunk and build an index
    ///
    /// Any embedding failure fails the whole build; no partial index is returned.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
        chunking: ChunkingParams,
    ) -> Result<Self> {
        Self::build_with_progress(chunks, embedder, batch_size, chunking, |_| {}).await
    }

    /// Like [`VectorIndex::build`], reporting the number of chunks embedded so far
    /// after every batch
    pub async fn build_with_progress<F>(
        chunks: Vec<Chunk>,
        embedder: &dyn EmbeddingProvider,
        batch_size: usize,
        chunking: ChunkingParams,
        mut on_progress: F,
    ) -> Result<Self>
    where
        F: FnMut(usize) + Send,
    {
        if batch_size == 0 {
            return Err(Error::input("batch size must be greater than 0"));
        }

        let dimensions = embedder.dimensions();
        let mut entries = Vec::with_capacity(chunks.len());

        for (batch_no, batch) in chunks.chunks(batch_size).enumerate() {
            let first = batch_no * batch_size;
            let last = first + batch.len() - 1;
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();

            let embeddings = embedder.embed_batch(&texts).await.map_err(|e| {
                Error::ingestion(format!("Embedding chunks {}..={} failed: {}", first, last, e))
            })?;

            if embeddings.len() != batch.len() {
                return Err(Error::ingestion(format!(
                    "Embedding chunks {}..={} returned {} vectors for {} texts",
                    first,
                    last,
                    embeddings.len(),
                    batch.len()
                )));
            }

            for (offset, (chunk, embedding)) in batch.iter().zip(embeddings).enumerate() {
                if embedding.len() != dimensions {
                    return Err(Error::ingestion(format!(
                        "Chunk {} embedded to {} dimensions, expected {} (check embeddings.dimensions)",
                        first + offset,
                        embedding.len(),
                        dimensions
                    )));
                }
                entries.push(IndexEntry {
                    id: (first + offset) as u64,
                    chunk: chunk.clone(),
                    embedding,
                });
            }

            tracing::debug!("Embedded chunks {}..={}", first, last);
            on_progress(entries.len());
        }

        Ok(Self {
            entries,
            info: IndexInfo {
                embedding_model: embedder.model_id(),
                dimensions,
                chunking,
                created_at: Utc::now(),
            },
        })
    }

    /// Build-time facts
    pub fn info(&self) -> &IndexInfo {
        &self.info
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.info.dimensions
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Refuse an index built by a different embedding function
    pub fn ensure_compatible(&self, embedding_model: &str, dimensions: usize) -> Result<()> {
        self.info.ensure_compatible(embedding_model, dimensions)
    }

    /// The `k` entries most similar to `embedding`, best first
    ///
    /// Ties keep insertion order. Returns every entry when fewer than `k` exist.
    pub fn query(&self, embedding: &[f32], k: usize) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(Error::input("k must be greater than 0"));
        }
        if embedding.len() != self.info.dimensions {
            return Err(Error::retrieval(format!(
                "Query has {} dimensions, index has {}",
                embedding.len(),
                self.info.dimensions
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(pos, entry)| (pos, cosine_similarity(embedding, &entry.embedding)))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(pos, similarity)| ScoredChunk {
                chunk: self.entries[pos].chunk.clone(),
                similarity,
            })
            .collect())
    }
}
