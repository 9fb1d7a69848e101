//! docs-rag: question answering over a documentation corpus
//!
//! Offline, scraped pages are chunked, embedded and persisted as a vector
//! index ([`ingestion::IndexBuilder`]). Online, the [`generation::RagChain`]
//! retrieves the most similar chunks for a question, stuffs them into a
//! grounded prompt and streams the model's answer together with the sources
//! it was drawn from, over SSE ([`server`]) or the terminal (`docs-rag ask`).

pub mod config;
pub mod error;
pub mod generation;
pub mod index;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod types;

pub use config::RagConfig;
pub use error::{Error, Result};
pub use generation::RagChain;
pub use index::{IndexHandle, VectorIndex};
pub use retrieval::Retriever;
pub use types::{
    Chunk, ChunkMetadata, CitedSource, GenerationEvent, QueryRequest, QueryResponse,
    RetrievalResult, ScoredChunk, SourceDocument,
};
