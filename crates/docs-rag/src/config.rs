//! Configuration for the RAG system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Environment variable holding the remote API credential
pub const API_KEY_ENV: &str = "DOCS_RAG_API_KEY";
/// Credential variable used by the DashScope tooling, accepted as a fallback
pub const DASHSCOPE_API_KEY_ENV: &str = "DASHSCOPE_API_KEY";

/// Main RAG system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Backend provider (local or remote)
    pub backend: BackendProvider,
    /// Server configuration
    pub server: ServerConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Ollama configuration (local backend)
    pub llm: LlmConfig,
    /// OpenAI-compatible API configuration (remote backend)
    pub remote: RemoteConfig,
    /// Vector index configuration
    pub index: IndexConfig,
    /// Retrieval configuration
    pub retrieval: RetrievalConfig,
    /// Generation limits
    pub generation: GenerationConfig,
    /// Prompt template parameters
    pub prompt: PromptConfig,
    /// Ingestion input
    pub ingestion: IngestionConfig,
}

/// Which embedding/generation backend to use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendProvider {
    /// Local Ollama server
    #[default]
    Local,
    /// OpenAI-compatible HTTP API (DashScope compatible mode, OpenAI, ...)
    Remote,
}

impl std::str::FromStr for BackendProvider {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(Self::Local),
            "remote" | "api" => Ok(Self::Remote),
            other => Err(Error::config(format!("Unknown backend '{}'", other))),
        }
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5001,
            enable_cors: true,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding dimensions (768 for nomic-embed-text; the remote backend asks
    /// the API for vectors of this size)
    pub dimensions: usize,
    /// Number of chunks sent per embedding call during a build
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: 768,
            batch_size: 10,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 800,
            chunk_overlap: 100,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Generation model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed one-shot requests
    pub max_retries: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            embed_model: "nomic-embed-text".to_string(),
            generate_model: "qwen2.5:7b".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            max_retries: 0,
        }
    }
}

/// OpenAI-compatible API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// API base URL (without the `/embeddings` or `/chat/completions` suffix)
    pub base_url: String,
    /// Embedding model name
    pub embed_model: String,
    /// Chat model name
    pub generate_model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// API key; read from the environment, never written back out
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            embed_model: "text-embedding-v3".to_string(),
            generate_model: "qwen-plus".to_string(),
            temperature: 0.3,
            timeout_secs: 120,
            api_key: None,
        }
    }
}

/// Vector index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Directory holding the persisted index
    pub storage_path: PathBuf,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./index_db"),
        }
    }
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks fed to the model
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 3 }
    }
}

/// Generation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Maximum number of generations in flight; further requests are refused
    pub max_concurrent: usize,
    /// Upper bound for a whole generation in seconds (0 disables)
    pub timeout_secs: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 32,
            timeout_secs: 300,
        }
    }
}

/// Prompt template parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Subject the assistant is an expert in
    pub domain: String,
    /// Language the answer must be written in
    pub language: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            domain: "FastAPI".to_string(),
            language: "Chinese".to_string(),
        }
    }
}

/// Ingestion input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// JSON array of `{url, title, content}` produced by the scraper
    pub documents_path: PathBuf,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            documents_path: PathBuf::from("./fastapi_docs.json"),
        }
    }
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides.
    ///
    /// Does not validate; call [`RagConfig::validate`] before building providers.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&raw)
    }

    /// Parse TOML configuration text
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| Error::config(format!("Invalid config: {}", e)))
    }

    /// Apply `DOCS_RAG_*` overrides using the given variable lookup
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).or_else(|| lookup(DASHSCOPE_API_KEY_ENV)) {
            if !key.trim().is_empty() {
                self.remote.api_key = Some(key.trim().to_string());
            }
        }

        if let Some(backend) = lookup("DOCS_RAG_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.backend = backend,
                Err(e) => tracing::warn!("Ignoring DOCS_RAG_BACKEND: {}", e),
            }
        }

        if let Some(path) = lookup("DOCS_RAG_INDEX_PATH") {
            self.index.storage_path = PathBuf::from(path);
        }

        if let Some(path) = lookup("DOCS_RAG_DOCUMENTS_PATH") {
            self.ingestion.documents_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("DOCS_RAG_OLLAMA_URL") {
            self.llm.base_url = url;
        }

        if let Some(port) = lookup("DOCS_RAG_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring DOCS_RAG_PORT: '{}' is not a port", port),
            }
        }
    }

    /// Check the invariants every component relies on
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::config("chunking.chunk_size must be greater than 0"));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::config("retrieval.top_k must be greater than 0"));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::config("embeddings.dimensions must be greater than 0"));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::config("embeddings.batch_size must be greater than 0"));
        }
        if self.generation.max_concurrent == 0 {
            return Err(Error::config("generation.max_concurrent must be greater than 0"));
        }
        if self.backend == BackendProvider::Remote && self.api_key().is_none() {
            return Err(Error::config(format!(
                "Remote backend selected but no API key found; set {} or {}",
                API_KEY_ENV, DASHSCOPE_API_KEY_ENV
            )));
        }
        Ok(())
    }

    /// Remote API key, if one is configured
    pub fn api_key(&self) -> Option<&str> {
        self.remote
            .api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }

    /// Embedding model identifier stored with the index (`<provider>:<model>`)
    pub fn embedding_model_id(&self) -> String {
        match self.backend {
            BackendProvider::Local => format!("ollama:{}", self.llm.embed_model),
            BackendProvider::Remote => format!("remote:{}", self.remote.embed_model),
        }
    }
}
