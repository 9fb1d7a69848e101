//! Events produced by a streaming generation

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::document::Chunk;

/// A source cited alongside an answer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CitedSource {
    /// Document title
    pub title: String,
    /// Document URL
    pub url: String,
}

impl CitedSource {
    /// Remove repeated `(title, url)` pairs, keeping first-seen order
    pub fn dedup<I>(sources: I) -> Vec<CitedSource>
    where
        I: IntoIterator<Item = CitedSource>,
    {
        let mut seen = HashSet::new();
        sources
            .into_iter()
            .filter(|source| seen.insert(source.clone()))
            .collect()
    }

    /// Render as `- title: url` for terminal output
    pub fn format_line(&self) -> String {
        format!("- {}: {}", self.title, self.url)
    }
}

impl From<&Chunk> for CitedSource {
    fn from(chunk: &Chunk) -> Self {
        Self {
            title: chunk.metadata.title.clone(),
            url: chunk.metadata.source.clone(),
        }
    }
}

/// Unit streamed to the caller during a generation
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationEvent {
    /// A piece of the answer text
    AnswerDelta(String),
    /// Sources of every retrieved chunk, in rank order (may repeat)
    SourceList(Vec<CitedSource>),
    /// Generation finished
    End,
    /// Generation failed; nothing follows
    Error(String),
}

impl GenerationEvent {
    /// Whether no event may follow this one
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::End | Self::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(title: &str, url: &str) -> CitedSource {
        CitedSource {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_dedup_keeps_first_seen_order() {
        let deduped = CitedSource::dedup(vec![
            source("Body", "https://b"),
            source("Intro", "https://a"),
            source("Body", "https://b"),
            source("Body", "https://c"),
        ]);

        assert_eq!(
            deduped,
            vec![
                source("Body", "https://b"),
                source("Intro", "https://a"),
                source("Body", "https://c"),
            ]
        );
    }

    #[test]
    fn test_terminal_events() {
        assert!(GenerationEvent::End.is_terminal());
        assert!(GenerationEvent::Error("x".into()).is_terminal());
        assert!(!GenerationEvent::AnswerDelta("x".into()).is_terminal());
        assert!(!GenerationEvent::SourceList(Vec::new()).is_terminal());
    }
}
