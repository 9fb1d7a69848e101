//! LLM provider trait for generating answers

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::generation::prompt::Prompt;

/// Incremental answer text from a streaming generation
pub type TextStream = BoxStream<'static, Result<String>>;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OllamaLlm`: Local Ollama server (qwen2.5, llama3, ...)
/// - `RemoteLlm`: OpenAI-compatible chat completions (qwen-plus via DashScope)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate the full answer in one call
    async fn generate(&self, prompt: &Prompt) -> Result<String>;

    /// Start a streaming generation
    ///
    /// Dropping the returned stream must abort the underlying request.
    async fn generate_stream(&self, prompt: &Prompt) -> Result<TextStream>;

    /// Check if the provider is healthy and available
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
