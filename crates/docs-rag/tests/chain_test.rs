//! RAG chain: one-shot answers, event streams and their SSE encoding

mod common;

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;

use common::{
    fastapi_chain, test_config, BrokenStreamLlm, FailingEmbedder, KeywordEmbedder, ScriptedLlm,
    StallingLlm,
};
use docs_rag::error::Error;
use docs_rag::generation::sse::{encode, WireFrame};
use docs_rag::generation::EventStream;
use docs_rag::providers::{SharedEmbedder, SharedLlm};
use docs_rag::{CitedSource, GenerationEvent};

async fn collect(events: EventStream) -> Vec<GenerationEvent> {
    events.collect().await
}

async fn frames(events: EventStream) -> Vec<WireFrame> {
    encode(events).collect().await
}

#[tokio::test]
async fn test_stream_matches_invoke() {
    let config = test_config();
    let llm = ScriptedLlm::new(&["FastAPI is ", "a modern ", "web framework."]);
    let chain = fastapi_chain(&config, KeywordEmbedder::shared(), llm.clone()).await;

    let response = chain.invoke("What is FastAPI?").await.unwrap();
    let events = collect(chain.stream_events("What is FastAPI?").unwrap()).await;

    assert!(matches!(events.first(), Some(GenerationEvent::SourceList(list)) if list.len() == 3));
    assert_eq!(events.last(), Some(&GenerationEvent::End));
    assert_eq!(events.iter().filter(|e| e.is_terminal()).count(), 1);

    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            GenerationEvent::AnswerDelta(text) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, response.answer);
    assert_eq!(response.answer, llm.answer());
    assert_eq!(response.chunks_retrieved, 3);
    assert_eq!(response.sources.len(), 2);
}

#[tokio::test]
async fn test_sse_frames_for_a_successful_answer() {
    let config = test_config();
    let llm = ScriptedLlm::new(&["FastAPI is ", "a modern web framework."]);
    let chain = fastapi_chain(&config, KeywordEmbedder::shared(), llm).await;

    let frames = frames(chain.stream_events("What is FastAPI?").unwrap()).await;

    let names: Vec<&str> = frames.iter().map(|f| f.event).collect();
    assert_eq!(names, vec!["sources", "answer_chunk", "answer_chunk", "end"]);

    let sources: Vec<CitedSource> = serde_json::from_str(&frames[0].data).unwrap();
    assert_eq!(sources.len(), 2);
    assert!(sources
        .iter()
        .any(|s| s.url == "https://fastapi.tiangolo.com/tutorial/path-params/"));

    let text: String = frames
        .iter()
        .filter(|f| f.event == "answer_chunk")
        .map(|f| {
            let value: serde_json::Value = serde_json::from_str(&f.data).unwrap();
            value["content"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(text, "FastAPI is a modern web framework.");
    assert_eq!(frames[3].data, "[DONE]");
}

#[tokio::test]
async fn test_prompt_contains_ranked_context_and_question() {
    let config = test_config();
    let llm = ScriptedLlm::new(&["ok"]);
    let chain = fastapi_chain(&config, KeywordEmbedder::shared(), llm.clone()).await;

    chain.invoke_with_k("What is FastAPI?", Some(1)).await.unwrap();

    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 1);
    let text = prompts[0].to_single_text();
    assert!(text.contains("What is FastAPI?"));
    assert!(text.contains("FastAPI"));
    assert!(!text.contains("{context}"));
}

#[tokio::test]
async fn test_embedding_failure_yields_single_error_frame() {
    let config = test_config();
    let embedder: SharedEmbedder = Arc::new(FailingEmbedder);
    let chain = fastapi_chain(&config, embedder, ScriptedLlm::new(&["unused"])).await;

    let frames = frames(chain.stream_events("What is FastAPI?").unwrap()).await;
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].event, "error");

    let body: serde_json::Value = serde_json::from_str(&frames[0].data).unwrap();
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("embedding service unavailable"));

    let err = chain.invoke("What is FastAPI?").await.unwrap_err();
    assert!(matches!(err, Error::Retrieval(_)));
}

#[tokio::test]
async fn test_broken_stream_ends_with_generation_error() {
    let config = test_config();
    let llm: SharedLlm = Arc::new(BrokenStreamLlm);
    let chain = fastapi_chain(&config, KeywordEmbedder::shared(), llm).await;

    let events = collect(chain.stream_events("What is FastAPI?").unwrap()).await;
    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], GenerationEvent::SourceList(_)));
    assert_eq!(events[1], GenerationEvent::AnswerDelta("FastAPI ".into()));
    match &events[2] {
        GenerationEvent::Error(message) => {
            assert!(message.starts_with("Generation failed"));
            assert!(message.contains("connection reset"));
        }
        other => panic!("expected an error event, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_questions_fail_before_streaming() {
    let config = test_config();
    let embedder = KeywordEmbedder::shared();
    let shared: SharedEmbedder = embedder.clone();
    let chain = fastapi_chain(&config, shared, ScriptedLlm::new(&["unused"])).await;

    assert!(matches!(chain.stream_events("   "), Err(Error::Input(_))));
    assert!(matches!(
        chain.stream_events_with_k("What is FastAPI?", Some(0)),
        Err(Error::Input(_))
    ));
    assert!(matches!(chain.invoke("").await, Err(Error::Input(_))));
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_dropping_the_stream_cancels_generation() {
    let config = test_config();
    let llm = StallingLlm::new();
    let chain = fastapi_chain(&config, KeywordEmbedder::shared(), llm.clone()).await;
    let permits = chain.available_permits();

    let mut events = chain.stream_events("What is FastAPI?").unwrap();
    assert!(matches!(events.next().await, Some(GenerationEvent::SourceList(_))));
    assert_eq!(
        events.next().await,
        Some(GenerationEvent::AnswerDelta("FastAPI is".into()))
    );

    let stalled = tokio::time::timeout(Duration::from_millis(50), events.next()).await;
    assert!(stalled.is_err());
    assert!(!llm.stream_dropped());
    assert_eq!(chain.available_permits(), permits - 1);

    drop(events);
    assert!(llm.stream_dropped());
    assert_eq!(chain.available_permits(), permits);
}

#[tokio::test]
async fn test_generation_timeout_is_reported() {
    let mut config = test_config();
    config.generation.timeout_secs = 1;
    let chain = fastapi_chain(&config, KeywordEmbedder::shared(), StallingLlm::new()).await;

    let events = collect(chain.stream_events("What is FastAPI?").unwrap()).await;

    assert_eq!(events.len(), 3);
    assert_eq!(
        events.last(),
        Some(&GenerationEvent::Error("Generation failed: generation timed out".into()))
    );
}

#[tokio::test]
async fn test_requests_beyond_the_limit_are_refused() {
    let mut config = test_config();
    config.generation.max_concurrent = 1;
    let chain = fastapi_chain(&config, KeywordEmbedder::shared(), StallingLlm::new()).await;

    let first = chain.stream_events("What is FastAPI?").unwrap();
    assert!(matches!(
        chain.stream_events("What is FastAPI?"),
        Err(Error::Overloaded(_))
    ));
    assert!(matches!(
        chain.invoke("What is FastAPI?").await,
        Err(Error::Overloaded(_))
    ));

    drop(first);
    let second = chain.stream_events("What is FastAPI?");
    assert!(second.is_ok());
}
