//! Query request types

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Longest question accepted, in characters
pub const MAX_QUESTION_CHARS: usize = 4000;

/// Question sent to `/api/chat` or `/api/query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The question to answer
    #[serde(default)]
    pub question: String,

    /// Number of chunks to retrieve (defaults to `retrieval.top_k`)
    #[serde(default)]
    pub top_k: Option<usize>,
}

impl QueryRequest {
    /// Create a new query
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            top_k: None,
        }
    }

    /// Set the number of results to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = Some(k);
        self
    }

    /// Reject requests that must not reach retrieval
    pub fn validate(&self) -> Result<()> {
        validate_question(&self.question)?;
        if self.top_k == Some(0) {
            return Err(Error::input("top_k must be greater than 0"));
        }
        Ok(())
    }
}

/// Check that a question is present and of reasonable length
pub fn validate_question(question: &str) -> Result<()> {
    if question.trim().is_empty() {
        return Err(Error::input("Request body is missing the 'question' field"));
    }
    if question.chars().count() > MAX_QUESTION_CHARS {
        return Err(Error::input(format!(
            "Question exceeds {} characters",
            MAX_QUESTION_CHARS
        )));
    }
    Ok(())
}
