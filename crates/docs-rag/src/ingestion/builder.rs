//! Offline index build: documents → chunks → embeddings → persisted index

use std::path::PathBuf;

use serde::Serialize;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::index::{ChunkingParams, VectorIndex};
use crate::providers::{self, SharedEmbedder};

use super::chunker::TextChunker;
use super::loader::load_documents;

/// Progress notifications from a build
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildProgress {
    /// Documents loaded from the input file
    Loaded { documents: usize },
    /// Documents split into chunks
    Chunked { chunks: usize },
    /// Chunks embedded so far
    Embedded { done: usize, total: usize },
    /// Index written to disk
    Persisted,
}

/// Summary of a finished build
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Documents read
    pub documents: usize,
    /// Chunks indexed
    pub chunks: usize,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Index directory
    pub location: PathBuf,
}

/// Builds and persists an index from the scraped corpus
pub struct IndexBuilder {
    config: RagConfig,
    embedder: SharedEmbedder,
}

impl IndexBuilder {
    /// Create a builder using the embedder selected by `config.backend`
    pub fn new(config: RagConfig) -> Result<Self> {
        config.validate()?;
        let embedder = providers::build_embedder(&config)?;
        Ok(Self { config, embedder })
    }

    /// Create a builder with an explicit embedder
    pub fn with_embedder(config: RagConfig, embedder: SharedEmbedder) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, embedder })
    }

    /// Run the build; nothing is written unless every step succeeds
    pub async fn run(&self) -> Result<BuildReport> {
        self.run_with_progress(|_| {}).await
    }

    /// Run the build, reporting progress
    pub async fn run_with_progress<F>(&self, mut on_progress: F) -> Result<BuildReport>
    where
        F: FnMut(BuildProgress) + Send,
    {
        let input = &self.config.ingestion.documents_path;
        let location = self.config.index.storage_path.clone();

        tracing::info!("Loading documents from '{}'", input.display());
        let documents = load_documents(input)?;
        tracing::info!("Loaded {} documents", documents.len());
        on_progress(BuildProgress::Loaded {
            documents: documents.len(),
        });

        let chunker = TextChunker::from_config(&self.config.chunking)?;
        let chunks = chunker.split(&documents);
        tracing::info!(
            "Split {} documents into {} chunks",
            documents.len(),
            chunks.len()
        );
        if chunks.is_empty() {
            return Err(Error::ingestion(format!(
                "'{}' contains no text to index",
                input.display()
            )));
        }
        on_progress(BuildProgress::Chunked {
            chunks: chunks.len(),
        });

        tracing::info!(
            "Embedding with {} ({})",
            self.embedder.name(),
            self.embedder.model_id()
        );
        let total = chunks.len();
        let params = ChunkingParams {
            chunk_size: chunker.chunk_size(),
            chunk_overlap: chunker.overlap(),
        };
        let index = VectorIndex::build_with_progress(
            chunks,
            self.embedder.as_ref(),
            self.config.embeddings.batch_size,
            params,
            |done| on_progress(BuildProgress::Embedded { done, total }),
        )
        .await?;

        let persist_location = location.clone();
        let index = tokio::task::spawn_blocking(move || {
            index.persist(&persist_location).map(|_| index)
        })
        .await
        .map_err(|e| Error::internal(format!("Persist task failed: {}", e)))??;
        on_progress(BuildProgress::Persisted);

        tracing::info!("Index written to '{}'", location.display());

        Ok(BuildReport {
            documents: documents.len(),
            chunks: index.len(),
            dimensions: index.dimensions(),
            location,
        })
    }
}
