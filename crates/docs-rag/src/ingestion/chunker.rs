//! Fixed-size overlapping text windows
//!
//! Sizes are counted in extended grapheme clusters so a window boundary never
//! falls inside a user-perceived character (CJK text, combining accents, emoji).

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::error::{Error, Result};
use crate::types::{Chunk, SourceDocument};

/// Text chunker with configurable size and overlap
#[derive(Debug, Clone, Copy)]
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Characters shared by consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker; requires `overlap < chunk_size`
    pub fn new(chunk_size: usize, overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::input("chunk size must be greater than 0"));
        }
        if overlap >= chunk_size {
            return Err(Error::input(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            overlap,
        })
    }

    /// Create a chunker from configuration
    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Maximum chunk size in characters
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Overlap between consecutive chunks in characters
    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split every document, preserving document order and reading order
    pub fn split(&self, documents: &[SourceDocument]) -> Vec<Chunk> {
        documents
            .iter()
            .flat_map(|doc| self.chunk_document(doc))
            .collect()
    }

    /// Split one document into chunks carrying its metadata
    pub fn chunk_document(&self, doc: &SourceDocument) -> Vec<Chunk> {
        let metadata = doc.metadata();
        self.windows(&doc.content)
            .into_iter()
            .enumerate()
            .map(|(order, text)| Chunk::new(text.to_string(), metadata.clone(), order as u32))
            .collect()
    }

    /// Slice text into windows of at most `chunk_size` characters, each starting
    /// `chunk_size - overlap` characters after the previous one
    pub fn windows<'a>(&self, text: &'a str) -> Vec<&'a str> {
        // Byte offset of every grapheme start, plus the end of the text
        let bounds: Vec<usize> = text
            .grapheme_indices(true)
            .map(|(offset, _)| offset)
            .chain(std::iter::once(text.len()))
            .collect();
        let total = bounds.len() - 1;

        let mut windows = Vec::new();
        if total == 0 {
            return windows;
        }

        let stride = self.chunk_size - self.overlap;
        let mut start = 0usize;
        loop {
            let end = (start + self.chunk_size).min(total);
            windows.push(&text[bounds[start]..bounds[end]]);
            if end == total {
                break;
            }
            start += stride;
        }

        windows
    }
}

/// Split documents into chunks of at most `max_size` characters with `overlap`
/// characters shared between neighbours
pub fn split(documents: &[SourceDocument], max_size: usize, overlap: usize) -> Result<Vec<Chunk>> {
    Ok(TextChunker::new(max_size, overlap)?.split(documents))
}
