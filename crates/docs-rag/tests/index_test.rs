//! Index build, persistence and retrieval against a deterministic embedder

mod common;

use std::sync::Arc;

use common::{build_index, fastapi_chunks, keyword_vector, KeywordEmbedder};
use docs_rag::error::Error;
use docs_rag::providers::SharedEmbedder;
use docs_rag::{IndexHandle, Retriever, VectorIndex};

#[tokio::test]
async fn test_reloaded_index_answers_like_the_built_one() {
    let embedder = KeywordEmbedder::default();
    let built = build_index(fastapi_chunks(), &embedder).await;

    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("index_db");
    built.persist(&location).unwrap();
    let loaded = VectorIndex::load(&location).unwrap();

    assert_eq!(loaded.entries(), built.entries());
    assert_eq!(loaded.info(), built.info());

    for question in ["What is FastAPI?", "path parameters", "type hints"] {
        let query = keyword_vector(question);
        let before = built.query(&query, 2).unwrap();
        let after = loaded.query(&query, 2).unwrap();
        assert_eq!(before, after, "results differ for {:?}", question);
    }
}

#[tokio::test]
async fn test_k_larger_than_index_returns_everything_ranked() {
    let index = build_index(fastapi_chunks(), &KeywordEmbedder::default()).await;

    let results = index.query(&keyword_vector("What is FastAPI?"), 10).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results
        .windows(2)
        .all(|pair| pair[0].similarity >= pair[1].similarity));
    assert!(results[0].chunk.text.contains("FastAPI"));
}

#[tokio::test]
async fn test_zero_k_is_rejected_before_embedding() {
    let embedder = KeywordEmbedder::shared();
    let index = build_index(fastapi_chunks(), embedder.as_ref()).await;
    let calls_after_build = embedder.calls();

    let shared: SharedEmbedder = embedder.clone();
    let retriever = Retriever::new(Arc::new(IndexHandle::new(index)), shared, 3).unwrap();

    let err = retriever.retrieve("What is FastAPI?", 0).await.unwrap_err();
    assert!(matches!(err, Error::Input(_)));
    assert_eq!(embedder.calls(), calls_after_build);
}

#[tokio::test]
async fn test_retrieval_is_repeatable() {
    let embedder = KeywordEmbedder::shared();
    let index = build_index(fastapi_chunks(), embedder.as_ref()).await;
    let shared: SharedEmbedder = embedder;
    let retriever = Retriever::new(Arc::new(IndexHandle::new(index)), shared, 2).unwrap();

    let first = retriever.retrieve_default("What is FastAPI?").await.unwrap();
    let second = retriever.retrieve_default("What is FastAPI?").await.unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_retriever_refuses_index_from_another_model() {
    let index = build_index(fastapi_chunks(), &KeywordEmbedder::default()).await;
    assert_eq!(index.info().embedding_model, common::MODEL_ID);

    struct OtherModel;

    #[async_trait::async_trait]
    impl docs_rag::providers::EmbeddingProvider for OtherModel {
        async fn embed(&self, text: &str) -> docs_rag::Result<Vec<f32>> {
            Ok(keyword_vector(text))
        }
        fn dimensions(&self) -> usize {
            common::DIMENSIONS
        }
        fn model_id(&self) -> String {
            "test:other".to_string()
        }
        async fn health_check(&self) -> docs_rag::Result<bool> {
            Ok(true)
        }
        fn name(&self) -> &str {
            "other"
        }
    }

    let other: SharedEmbedder = Arc::new(OtherModel);
    let result = Retriever::new(Arc::new(IndexHandle::new(index)), other, 3);
    assert!(matches!(result, Err(Error::Config(_))));
}

#[tokio::test]
async fn test_reload_serves_the_rebuilt_index() {
    let embedder = KeywordEmbedder::default();
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().join("index_db");

    let mut chunks = fastapi_chunks();
    chunks.truncate(1);
    build_index(chunks, &embedder).await.persist(&location).unwrap();

    let handle = IndexHandle::open(&location).await.unwrap();
    assert_eq!(handle.current().len(), 1);

    build_index(fastapi_chunks(), &embedder)
        .await
        .persist(&location)
        .unwrap();
    let previous = handle.reload().await.unwrap();

    assert_eq!(previous.len(), 1);
    assert_eq!(handle.current().len(), 3);
}

#[test]
fn test_missing_index_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let result = tokio_test::block_on(IndexHandle::open(&dir.path().join("index_db")));
    assert!(matches!(result, Err(Error::IndexNotFound(_))));
}
