//! Retrieval-augmented generation chain
//!
//! Retriever → prompt assembly → model call, in one-shot ([`RagChain::invoke`])
//! and streaming ([`RagChain::stream_events`]) forms. Each request walks the
//! [`ChainStage`] states and logs every transition.

use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use uuid::Uuid;

use crate::config::{GenerationConfig, RagConfig};
use crate::error::{Error, Result};
use crate::index::IndexHandle;
use crate::providers::{self, SharedEmbedder, SharedLlm};
use crate::retrieval::Retriever;
use crate::types::query::validate_question;
use crate::types::{CitedSource, GenerationEvent, QueryResponse};

use super::prompt::{assemble, PromptTemplate};

/// Events of one streaming generation
pub type EventStream = BoxStream<'static, GenerationEvent>;

/// Per-request pipeline state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainStage {
    Idle,
    Retrieving,
    Assembling,
    Generating,
    Completed,
    Failed,
}

impl fmt::Display for ChainStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChainStage::Idle => "idle",
            ChainStage::Retrieving => "retrieving",
            ChainStage::Assembling => "assembling",
            ChainStage::Generating => "generating",
            ChainStage::Completed => "completed",
            ChainStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Logs stage transitions of a single request
struct StageTracker {
    request_id: Uuid,
    stage: ChainStage,
}

impl StageTracker {
    fn new() -> Self {
        Self {
            request_id: Uuid::new_v4(),
            stage: ChainStage::Idle,
        }
    }

    fn enter(&mut self, next: ChainStage) {
        tracing::info!(request_id = %self.request_id, "{} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&mut self, error: &Error) {
        tracing::error!(request_id = %self.request_id, "Failed while {}: {}", self.stage, error);
        self.stage = ChainStage::Failed;
    }
}

/// The RAG chain shared by every request
pub struct RagChain {
    retriever: Arc<Retriever>,
    llm: SharedLlm,
    template: Arc<PromptTemplate>,
    limiter: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl RagChain {
    /// Assemble a chain from its parts
    pub fn new(
        retriever: Retriever,
        llm: SharedLlm,
        template: PromptTemplate,
        limits: &GenerationConfig,
    ) -> Self {
        Self {
            retriever: Arc::new(retriever),
            llm,
            template: Arc::new(template),
            limiter: Arc::new(Semaphore::new(limits.max_concurrent.max(1))),
            timeout: (limits.timeout_secs > 0).then(|| Duration::from_secs(limits.timeout_secs)),
        }
    }

    /// Build everything from configuration, in order: embedding provider,
    /// index (with compatibility check), retriever, LLM provider, chain
    pub async fn from_config(config: &RagConfig) -> Result<Self> {
        config.validate()?;

        let embedder = providers::build_embedder(config)?;
        tracing::info!("Embedding provider ready: {}", embedder.model_id());

        let index = Arc::new(IndexHandle::open(&config.index.storage_path).await?);
        tracing::info!("Index loaded: {} chunks", index.current().len());

        let llm = providers::build_llm(config)?;
        Self::from_parts(config, index, embedder, llm)
    }

    /// Build with already constructed index and providers
    pub fn from_parts(
        config: &RagConfig,
        index: Arc<IndexHandle>,
        embedder: SharedEmbedder,
        llm: SharedLlm,
    ) -> Result<Self> {
        let retriever = Retriever::new(index, embedder, config.retrieval.top_k)?;
        tracing::info!(
            "RAG chain ready (model {}, top_k {})",
            llm.model(),
            retriever.default_k()
        );

        Ok(Self::new(
            retriever,
            llm,
            PromptTemplate::from_config(&config.prompt),
            &config.generation,
        ))
    }

    /// The retriever
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// The LLM provider
    pub fn llm(&self) -> &SharedLlm {
        &self.llm
    }

    /// Generations that can still be admitted right now
    pub fn available_permits(&self) -> usize {
        self.limiter.available_permits()
    }

    fn admit(&self) -> Result<OwnedSemaphorePermit> {
        Arc::clone(&self.limiter)
            .try_acquire_owned()
            .map_err(|_| Error::Overloaded("too many generations in progress".to_string()))
    }

    fn resolve_k(&self, k: Option<usize>) -> Result<usize> {
        match k {
            Some(0) => Err(Error::input("top_k must be greater than 0")),
            Some(k) => Ok(k),
            None => Ok(self.retriever.default_k()),
        }
    }

    /// Answer `question` in one call
    pub async fn invoke(&self, question: &str) -> Result<QueryResponse> {
        self.invoke_with_k(question, None).await
    }

    /// Answer `question` using `k` chunks (default `retrieval.top_k`)
    pub async fn invoke_with_k(&self, question: &str, k: Option<usize>) -> Result<QueryResponse> {
        validate_question(question)?;
        let k = self.resolve_k(k)?;
        let _permit = self.admit()?;

        let start = Instant::now();
        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);
        let mut tracker = StageTracker::new();

        let result = async {
            tracker.enter(ChainStage::Retrieving);
            let context = within(deadline, self.retriever.retrieve(question, k)).await?;

            tracker.enter(ChainStage::Assembling);
            let prompt = assemble(question, context.iter().map(|r| &r.chunk), &self.template);

            tracker.enter(ChainStage::Generating);
            let answer = within(deadline, self.llm.generate(&prompt)).await?;
            Ok::<_, Error>((answer, context))
        }
        .await;

        match result {
            Ok((answer, context)) => {
                tracker.enter(ChainStage::Completed);
                Ok(QueryResponse::new(
                    answer,
                    &context,
                    start.elapsed().as_millis() as u64,
                ))
            }
            Err(e) => {
                tracker.fail(&e);
                Err(e)
            }
        }
    }

    /// Stream the answer for `question`
    pub fn stream_events(&self, question: &str) -> Result<EventStream> {
        self.stream_events_with_k(question, None)
    }

    /// Stream the answer using `k` chunks (default `retrieval.top_k`)
    ///
    /// Input validation and admission happen before this returns. The stream
    /// then yields one `SourceList`, the answer deltas and `End`, or a single
    /// `Error`. Dropping it cancels the model request.
    pub fn stream_events_with_k(&self, question: &str, k: Option<usize>) -> Result<EventStream> {
        validate_question(question)?;
        let k = self.resolve_k(k)?;
        let permit = self.admit()?;

        let question = question.to_string();
        let retriever = Arc::clone(&self.retriever);
        let llm = Arc::clone(&self.llm);
        let template = Arc::clone(&self.template);
        let deadline = self.timeout.map(|t| tokio::time::Instant::now() + t);

        let stream = async_stream::stream! {
            let _permit = permit;
            let mut tracker = StageTracker::new();

            tracker.enter(ChainStage::Retrieving);
            let context = match within(deadline, retriever.retrieve(&question, k)).await {
                Ok(context) => context,
                Err(e) => {
                    tracker.fail(&e);
                    yield GenerationEvent::Error(e.to_string());
                    return;
                }
            };
            yield GenerationEvent::SourceList(
                context.iter().map(|r| CitedSource::from(&r.chunk)).collect(),
            );

            tracker.enter(ChainStage::Assembling);
            let prompt = assemble(&question, context.iter().map(|r| &r.chunk), &template);

            tracker.enter(ChainStage::Generating);
            let mut text = match within(deadline, llm.generate_stream(&prompt)).await {
                Ok(text) => text,
                Err(e) => {
                    tracker.fail(&e);
                    yield GenerationEvent::Error(e.to_string());
                    return;
                }
            };

            loop {
                let next = match within(deadline, async { Ok(text.next().await) }).await {
                    Ok(next) => next,
                    Err(e) => {
                        tracker.fail(&e);
                        yield GenerationEvent::Error(e.to_string());
                        return;
                    }
                };
                match next {
                    Some(Ok(delta)) => yield GenerationEvent::AnswerDelta(delta),
                    Some(Err(e)) => {
                        let e = match e {
                            Error::Generation(_) => e,
                            other => Error::generation(other.to_string()),
                        };
                        tracker.fail(&e);
                        yield GenerationEvent::Error(e.to_string());
                        return;
                    }
                    None => break,
                }
            }

            tracker.enter(ChainStage::Completed);
            yield GenerationEvent::End;
        };

        Ok(stream.boxed())
    }
}

/// Run `fut`, failing with a generation timeout once `deadline` passes
async fn within<T, F>(deadline: Option<tokio::time::Instant>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match deadline {
        Some(deadline) => tokio::time::timeout_at(deadline, fut)
            .await
            .map_err(|_| Error::generation("generation timed out"))?,
        None => fut.await,
    }
}
