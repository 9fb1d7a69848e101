//! Scraped-corpus loading

use std::path::Path;

use crate::error::{Error, Result};
use crate::types::SourceDocument;

/// Read a JSON array of `{url, title, content}` objects
pub fn load_documents(path: &Path) -> Result<Vec<SourceDocument>> {
    let raw = std::fs::read(path).map_err(|e| {
        Error::ingestion(format!(
            "Cannot read documents file '{}': {} (run the scraper first)",
            path.display(),
            e
        ))
    })?;

    parse_documents(&raw)
        .map_err(|e| Error::ingestion(format!("Malformed documents file '{}': {}", path.display(), e)))
}

/// Parse the scraper's JSON output
pub fn parse_documents(raw: &[u8]) -> std::result::Result<Vec<SourceDocument>, serde_json::Error> {
    serde_json::from_slice(raw)
}
