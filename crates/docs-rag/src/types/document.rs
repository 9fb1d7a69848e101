//! Source documents and chunks with the metadata used for citations

use serde::{Deserialize, Serialize};

/// Fallback source URL for documents scraped without one
pub const UNKNOWN_SOURCE: &str = "unknown source";
/// Fallback title for documents scraped without one
pub const UNTITLED: &str = "untitled";

/// A scraped documentation page
///
/// Identity is the URL. Missing `url`/`title` fields in the scraper output are
/// replaced by [`UNKNOWN_SOURCE`] / [`UNTITLED`] when the document is parsed,
/// so nothing downstream needs to guess.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Page URL
    #[serde(default = "default_url", deserialize_with = "non_blank_url")]
    pub url: String,
    /// Page title
    #[serde(default = "default_title", deserialize_with = "non_blank_title")]
    pub title: String,
    /// Extracted page text
    #[serde(default)]
    pub content: String,
}

fn default_url() -> String {
    UNKNOWN_SOURCE.to_string()
}

fn default_title() -> String {
    UNTITLED.to_string()
}

fn non_blank_url<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(non_blank(value, UNKNOWN_SOURCE))
}

fn non_blank_title<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(non_blank(value, UNTITLED))
}

fn non_blank(value: Option<String>, fallback: &str) -> String {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => fallback.to_string(),
    }
}

impl SourceDocument {
    /// Create a document, applying the fallbacks for blank url/title
    pub fn new(url: impl Into<String>, title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: non_blank(Some(url.into()), UNKNOWN_SOURCE),
            title: non_blank(Some(title.into()), UNTITLED),
            content: content.into(),
        }
    }

    /// Metadata copied onto every chunk of this document
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            source: self.url.clone(),
            title: self.title.clone(),
        }
    }
}

/// Citation metadata carried by a chunk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChunkMetadata {
    /// URL of the parent document
    pub source: String,
    /// Title of the parent document
    pub title: String,
}

/// A bounded window of a document's text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Text content
    pub text: String,
    /// Parent document metadata
    pub metadata: ChunkMetadata,
    /// Window index within the parent document
    pub order: u32,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: String, metadata: ChunkMetadata, order: u32) -> Self {
        Self {
            text,
            metadata,
            order,
        }
    }
}
