//! Corpus ingestion: load scraped documents, chunk them, build the index

mod builder;
pub mod chunker;
mod loader;

pub use builder::{BuildProgress, BuildReport, IndexBuilder};
pub use chunker::{split, TextChunker};
pub use loader::{load_documents, parse_documents};
