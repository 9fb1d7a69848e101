//! Index manifest: what built the index and how to verify its payload

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Manifest file name inside an index directory
pub const MANIFEST_FILE: &str = "manifest.json";
/// Entry payload file name inside an index directory
pub const ENTRIES_FILE: &str = "entries.bin";
/// Current on-disk layout version
pub const FORMAT_VERSION: u32 = 1;

/// Chunking parameters an index was built with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingParams {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

/// Build-time facts about an index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    /// Embedding function identifier (`provider:model`)
    pub embedding_model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Chunking parameters
    pub chunking: ChunkingParams,
    /// Build time
    pub created_at: DateTime<Utc>,
}

impl IndexInfo {
    /// Refuse an index built by a different embedding function
    pub fn ensure_compatible(&self, embedding_model: &str, dimensions: usize) -> Result<()> {
        if self.embedding_model != embedding_model {
            return Err(Error::config(format!(
                "Index was built with embedding model '{}' but '{}' is configured; rebuild the index",
                self.embedding_model, embedding_model
            )));
        }
        if self.dimensions != dimensions {
            return Err(Error::config(format!(
                "Index has {} dimensions but the embedder produces {}; rebuild the index",
                self.dimensions, dimensions
            )));
        }
        Ok(())
    }
}

/// Contents of `manifest.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexManifest {
    /// On-disk layout version
    pub format_version: u32,
    /// Build-time facts
    #[serde(flatten)]
    pub info: IndexInfo,
    /// Number of entries in `entries.bin`
    pub entry_count: usize,
    /// Hex SHA-256 of `entries.bin`
    pub checksum: String,
}

/// Hex SHA-256 of a payload
pub fn checksum(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    hex::encode(hasher.finalize())
}
