//! Error types for the RAG system

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for RAG operations
pub type Result<T> = std::result::Result<T, Error>;

/// RAG system errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error (missing credential, bad parameters, incompatible index)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Offline build failure (unreadable input, embedding failure during build)
    #[error("Ingestion failed: {0}")]
    Ingestion(String),

    /// No persisted index at the given location
    #[error("No index found at '{0}'")]
    IndexNotFound(String),

    /// Persisted index exists but cannot be decoded
    #[error("Index at '{location}' is corrupt: {message}")]
    IndexCorrupt { location: String, message: String },

    /// Embedding service failure
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// Query-time embedding or similarity failure
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Model call failure, timeout or malformed stream
    #[error("Generation failed: {0}")]
    Generation(String),

    /// Missing or malformed request input
    #[error("Invalid input: {0}")]
    Input(String),

    /// Too many generations in flight
    #[error("Service overloaded: {0}")]
    Overloaded(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an ingestion error
    pub fn ingestion(message: impl Into<String>) -> Self {
        Self::Ingestion(message.into())
    }

    /// Create an index corruption error
    pub fn index_corrupt(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::IndexCorrupt {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create a retrieval error
    pub fn retrieval(message: impl Into<String>) -> Self {
        Self::Retrieval(message.into())
    }

    /// Create a generation error
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation(message.into())
    }

    /// Create an input error
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Short machine-readable tag used in API error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Ingestion(_) => "ingestion_error",
            Error::IndexNotFound(_) => "index_not_found",
            Error::IndexCorrupt { .. } => "index_corrupt",
            Error::Embedding(_) => "embedding_error",
            Error::Retrieval(_) => "retrieval_error",
            Error::Generation(_) => "generation_error",
            Error::Input(_) => "input_error",
            Error::Overloaded(_) => "overloaded",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// HTTP status used when the error is returned from a handler
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Input(_) => StatusCode::BAD_REQUEST,
            Error::IndexNotFound(_) => StatusCode::NOT_FOUND,
            Error::Config(_) | Error::Overloaded(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Embedding(_) | Error::Retrieval(_) | Error::Generation(_) => {
                StatusCode::BAD_GATEWAY
            }
            Error::Ingestion(_)
            | Error::IndexCorrupt { .. }
            | Error::Io(_)
            | Error::Json(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
