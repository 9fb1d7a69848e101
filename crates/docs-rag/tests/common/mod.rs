//! Deterministic providers and corpus fixtures shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use docs_rag::error::{Error, Result};
use docs_rag::generation::prompt::Prompt;
use docs_rag::index::ChunkingParams;
use docs_rag::providers::{EmbeddingProvider, LlmProvider, SharedEmbedder, SharedLlm, TextStream};
use docs_rag::{Chunk, ChunkMetadata, IndexHandle, RagChain, RagConfig, VectorIndex};

pub const DIMENSIONS: usize = 64;
pub const MODEL_ID: &str = "test:keywords";

/// Bag-of-words embedder: every word lands in a hashed bucket
#[derive(Default)]
pub struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `embed` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn bucket(word: &str) -> usize {
    // FNV-1a
    let hash = word
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325u64, |h, b| (h ^ b as u64).wrapping_mul(0x0100_0000_01b3));
    (hash % (DIMENSIONS as u64 - 1)) as usize
}

pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        vector[bucket(&word.to_lowercase())] += 1.0;
    }
    // Keeps every vector non-zero
    vector[DIMENSIONS - 1] = 0.1;
    vector
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keyword_vector(text))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_id(&self) -> String {
        MODEL_ID.to_string()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "keywords"
    }
}

/// Same identity as [`KeywordEmbedder`], but the service is down
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::embedding("embedding service unavailable"))
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model_id(&self) -> String {
        MODEL_ID.to_string()
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Answers with fixed pieces and remembers every prompt it saw
pub struct ScriptedLlm {
    pieces: Vec<String>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedLlm {
    pub fn new(pieces: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            pieces: pieces.iter().map(|p| p.to_string()).collect(),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn answer(&self) -> String {
        self.pieces.concat()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedLlm {
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        self.prompts.lock().push(prompt.clone());
        Ok(self.answer())
    }

    async fn generate_stream(&self, prompt: &Prompt) -> Result<TextStream> {
        self.prompts.lock().push(prompt.clone());
        let pieces = self.pieces.clone();
        Ok(futures::stream::iter(pieces.into_iter().map(Ok)).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn model(&self) -> &str {
        "scripted-1"
    }
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Emits one piece, then never finishes; records when its stream is dropped
pub struct StallingLlm {
    dropped: Arc<AtomicBool>,
}

impl StallingLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            dropped: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn stream_dropped(&self) -> bool {
        self.dropped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmProvider for StallingLlm {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        futures::future::pending::<()>().await;
        Ok(String::new())
    }

    async fn generate_stream(&self, _prompt: &Prompt) -> Result<TextStream> {
        let guard = DropFlag(Arc::clone(&self.dropped));
        let stream = async_stream::stream! {
            let _guard = guard;
            yield Ok::<_, Error>("FastAPI is".to_string());
            futures::future::pending::<()>().await;
        };
        Ok(stream.boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }

    fn name(&self) -> &str {
        "stalling"
    }

    fn model(&self) -> &str {
        "stalling-1"
    }
}

/// Emits one piece, then the connection breaks
pub struct BrokenStreamLlm;

#[async_trait]
impl LlmProvider for BrokenStreamLlm {
    async fn generate(&self, _prompt: &Prompt) -> Result<String> {
        Err(Error::generation("connection reset"))
    }

    async fn generate_stream(&self, _prompt: &Prompt) -> Result<TextStream> {
        let items = vec![
            Ok("FastAPI ".to_string()),
            Err(Error::internal("connection reset")),
            Ok("never seen".to_string()),
        ];
        Ok(futures::stream::iter(items).boxed())
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }

    fn name(&self) -> &str {
        "broken"
    }

    fn model(&self) -> &str {
        "broken-1"
    }
}

pub fn chunk(url: &str, title: &str, text: &str, order: u32) -> Chunk {
    Chunk::new(
        text.to_string(),
        ChunkMetadata {
            source: url.to_string(),
            title: title.to_string(),
        },
        order,
    )
}

/// Three chunks from two pages
pub fn fastapi_chunks() -> Vec<Chunk> {
    vec![
        chunk(
            "https://fastapi.tiangolo.com/",
            "FastAPI",
            "FastAPI is a modern, fast web framework for building APIs with Python.",
            0,
        ),
        chunk(
            "https://fastapi.tiangolo.com/",
            "FastAPI",
            "FastAPI is based on standard Python type hints.",
            1,
        ),
        chunk(
            "https://fastapi.tiangolo.com/tutorial/path-params/",
            "Path Parameters",
            "You can declare path parameters with the same syntax used by Python format strings.",
            0,
        ),
    ]
}

pub fn chunking_params() -> ChunkingParams {
    ChunkingParams {
        chunk_size: 800,
        chunk_overlap: 100,
    }
}

pub async fn build_index(chunks: Vec<Chunk>, embedder: &dyn EmbeddingProvider) -> VectorIndex {
    VectorIndex::build(chunks, embedder, 2, chunking_params())
        .await
        .expect("index builds")
}

pub fn test_config() -> RagConfig {
    let mut config = RagConfig::default();
    config.embeddings.dimensions = DIMENSIONS;
    config
}

/// Chain over the FastAPI fixture, querying with `embedder`
pub async fn fastapi_chain(config: &RagConfig, embedder: SharedEmbedder, llm: SharedLlm) -> RagChain {
    let index = build_index(fastapi_chunks(), &KeywordEmbedder::default()).await;
    RagChain::from_parts(config, Arc::new(IndexHandle::new(index)), embedder, llm)
        .expect("chain builds")
}
