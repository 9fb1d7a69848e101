//! Question answering endpoints

use axum::{
    extract::{rejection::JsonRejection, State},
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::{stream::BoxStream, StreamExt};
use std::convert::Infallible;

use crate::error::{Error, Result};
use crate::generation::sse::encode;
use crate::server::state::AppState;
use crate::types::{QueryRequest, QueryResponse};

/// SSE body of `/api/chat`
pub type ChatStream = BoxStream<'static, std::result::Result<Event, Infallible>>;

/// Turn extractor rejections (missing body, bad JSON) into input errors
fn parse_request(payload: std::result::Result<Json<QueryRequest>, JsonRejection>) -> Result<QueryRequest> {
    let Json(request) = payload.map_err(|e| {
        Error::input(format!("Request body must be JSON with a 'question' field: {}", e.body_text()))
    })?;
    request.validate()?;
    Ok(request)
}

/// POST /api/chat - stream the answer as Server-Sent Events
pub async fn chat(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Sse<ChatStream>> {
    let chain = state.chain()?;
    let request = parse_request(payload)?;

    tracing::info!("Chat question: \"{}\"", request.question);

    let events = chain.stream_events_with_k(&request.question, request.top_k)?;
    let frames: ChatStream = encode(events)
        .map(|frame| Ok::<_, Infallible>(Event::from(frame)))
        .boxed();

    Ok(Sse::new(frames).keep_alive(KeepAlive::default()))
}

/// POST /api/query - answer in one JSON response
pub async fn query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>> {
    let chain = state.chain()?;
    let request = parse_request(payload)?;

    tracing::info!("Query: \"{}\"", request.question);

    let response = chain.invoke_with_k(&request.question, request.top_k).await?;

    tracing::info!(
        "Query completed in {}ms, {} sources",
        response.processing_time_ms,
        response.sources.len()
    );

    Ok(Json(response))
}
