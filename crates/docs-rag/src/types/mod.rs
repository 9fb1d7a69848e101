//! Core types for the RAG system

pub mod document;
pub mod event;
pub mod query;
pub mod response;

pub use document::{Chunk, ChunkMetadata, SourceDocument};
pub use event::{CitedSource, GenerationEvent};
pub use query::QueryRequest;
pub use response::{QueryResponse, RetrievalResult, ScoredChunk};
