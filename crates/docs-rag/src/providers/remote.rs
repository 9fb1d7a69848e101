//! OpenAI-compatible providers (DashScope compatible mode, OpenAI, vLLM, ...)

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RemoteConfig;
use crate::error::{Error, Result};
use crate::generation::prompt::Prompt;

use super::embedding::EmbeddingProvider;
use super::lines::byte_lines;
use super::llm::{LlmProvider, TextStream};

/// Terminal marker of an OpenAI-style event stream
const STREAM_DONE: &str = "[DONE]";

/// HTTP client for an OpenAI-compatible API
pub struct RemoteClient {
    client: Client,
    config: RemoteConfig,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    encoding_format: &'a str,
    dimensions: usize,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamResponse {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    delta: StreamDelta,
}

#[derive(Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

impl RemoteClient {
    /// Create a client; fails when no API key is configured
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| Error::config("Remote backend requires an API key"))?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth).map_err(|_| Error::config("Invalid API key"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        // Streamed answers may outlive `timeout_secs`; one-shot calls set it per request
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn embedding_request<'a>(
        &'a self,
        texts: &'a [String],
        dimensions: usize,
    ) -> EmbeddingRequest<'a> {
        EmbeddingRequest {
            model: &self.config.embed_model,
            input: texts,
            encoding_format: "float",
            dimensions,
        }
    }

    fn chat_request<'a>(&'a self, prompt: &'a Prompt, stream: bool) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.generate_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.config.temperature,
            stream,
        }
    }

    /// Embed a batch of texts into `dimensions`-sized vectors, returned in input order
    pub async fn embed_batch(&self, texts: &[String], dimensions: usize) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.url("embeddings"))
            .timeout(self.timeout())
            .json(&self.embedding_request(texts, dimensions))
            .send()
            .await
            .map_err(|e| Error::embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::embedding(format!(
                "Embedding failed: HTTP {} - {}",
                status, body
            )));
        }

        let mut parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if parsed.data.len() != texts.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    /// One-shot chat completion
    pub async fn generate(&self, prompt: &Prompt) -> Result<String> {
        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        let response = self
            .client
            .post(self.url("chat/completions"))
            .timeout(self.timeout())
            .json(&self.chat_request(prompt, false))
            .send()
            .await
            .map_err(|e| Error::generation(format!("Generation request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Generation failed: HTTP {} - {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::generation(format!("Failed to parse generation response: {}", e)))?;

        Ok(parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .unwrap_or_default())
    }

    /// Streaming chat completion (`data: {...}` lines until `data: [DONE]`)
    pub async fn generate_stream(&self, prompt: &Prompt) -> Result<TextStream> {
        let response = self
            .client
            .post(self.url("chat/completions"))
            .json(&self.chat_request(prompt, true))
            .send()
            .await
            .map_err(|e| Error::generation(format!("Stream request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::generation(format!(
                "Stream failed: HTTP {} - {}",
                status, body
            )));
        }

        let stream = async_stream::try_stream! {
            let lines = byte_lines(response.bytes_stream());
            futures::pin_mut!(lines);

            while let Some(line) = lines.next().await {
                let line = line?;
                let Some(payload) = line.strip_prefix("data:") else {
                    continue;
                };
                let payload = payload.trim();
                if payload == STREAM_DONE {
                    break;
                }
                if let Some(delta) = parse_stream_payload(payload)? {
                    yield delta;
                }
            }
        };

        Ok(stream.boxed())
    }

    /// Check that the API answers with our credentials
    pub async fn health_check(&self) -> Result<bool> {
        match self
            .client
            .get(self.url("models"))
            .timeout(self.timeout())
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

/// Extract the content delta from one stream payload
fn parse_stream_payload(payload: &str) -> Result<Option<String>> {
    let parsed: StreamResponse = serde_json::from_str(payload)
        .map_err(|e| Error::generation(format!("Malformed stream event: {}", e)))?;

    Ok(parsed
        .choices
        .into_iter()
        .find_map(|choice| choice.delta.content)
        .filter(|content| !content.is_empty()))
}

/// Embedding provider backed by `/embeddings`
pub struct RemoteEmbedder {
    client: Arc<RemoteClient>,
    dimensions: usize,
    model: String,
}

impl RemoteEmbedder {
    /// Create from an existing client
    pub fn from_client(client: Arc<RemoteClient>, dimensions: usize, model: String) -> Self {
        Self {
            client,
            dimensions,
            model,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for RemoteEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.client
            .embed_batch(&[text.to_string()], self.dimensions)
            .await?
            .pop()
            .ok_or_else(|| Error::embedding("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts, self.dimensions).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> String {
        format!("remote:{}", self.model)
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "remote"
    }
}

/// LLM provider backed by `/chat/completions`
pub struct RemoteLlm {
    client: Arc<RemoteClient>,
    model: String,
}

impl RemoteLlm {
    /// Create from an existing client
    pub fn from_client(client: Arc<RemoteClient>, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl LlmProvider for RemoteLlm {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.client.generate(prompt).await
    }

    async fn generate_stream(&self, prompt: &Prompt) -> Result<TextStream> {
        self.client.generate_stream(prompt).await
    }

    async fn health_check(&self) -> Result<bool> {
        self.client.health_check().await
    }

    fn name(&self) -> &str {
        "remote"
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_config_error() {
        let result = RemoteClient::new(&RemoteConfig::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_stream_payload_parsing() {
        let delta = parse_stream_payload(
            r#"{"id":"x","choices":[{"index":0,"delta":{"content":"路径"},"finish_reason":null}]}"#,
        )
        .unwrap();
        assert_eq!(delta.as_deref(), Some("路径"));

        let role_only =
            parse_stream_payload(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#).unwrap();
        assert!(role_only.is_none());

        let usage = parse_stream_payload(r#"{"choices":[],"usage":{"total_tokens":5}}"#).unwrap();
        assert!(usage.is_none());

        assert!(matches!(
            parse_stream_payload("{not json"),
            Err(Error::Generation(_))
        ));
    }

    #[test]
    fn test_chat_request_shape() {
        let config = RemoteConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let client = RemoteClient::new(&config).unwrap();
        let prompt = Prompt {
            system: "ctx".to_string(),
            user: "Question: q".to_string(),
        };

        let value = serde_json::to_value(client.chat_request(&prompt, false)).unwrap();
        assert_eq!(value["model"], "qwen-plus");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "Question: q");
        assert!(value.get("stream").is_none());

        let streaming = serde_json::to_value(client.chat_request(&prompt, true)).unwrap();
        assert_eq!(streaming["stream"], true);
        assert_eq!(
            client.url("chat/completions"),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
        );
    }

    #[test]
    fn test_embedding_request_asks_for_declared_dimensions() {
        let config = RemoteConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };
        let client = RemoteClient::new(&config).unwrap();
        let texts = vec!["路径参数".to_string(), "Path parameters".to_string()];

        let value = serde_json::to_value(client.embedding_request(&texts, 768)).unwrap();
        assert_eq!(value["model"], "text-embedding-v3");
        assert_eq!(value["input"][1], "Path parameters");
        assert_eq!(value["encoding_format"], "float");
        assert_eq!(value["dimensions"], 768);
        assert_eq!(
            client.url("embeddings"),
            "https://dashscope.aliyuncs.com/compatible-mode/v1/embeddings"
        );
    }
}
