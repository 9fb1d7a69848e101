//! Server-Sent Events encoding of generation events
//!
//! | event          | data                              |
//! |----------------|-----------------------------------|
//! | `answer_chunk` | `{"content": "..."}`              |
//! | `sources`      | `[{"title": "...", "url": "..."}]` |
//! | `end`          | `[DONE]`                          |
//! | `error`        | `{"error": "..."}`                |

use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};

use crate::types::{CitedSource, GenerationEvent};

/// Event name for answer text
pub const ANSWER_CHUNK_EVENT: &str = "answer_chunk";
/// Event name for the cited sources
pub const SOURCES_EVENT: &str = "sources";
/// Event name for successful completion
pub const END_EVENT: &str = "end";
/// Event name for failures
pub const ERROR_EVENT: &str = "error";
/// Data of the `end` event
pub const DONE_MARKER: &str = "[DONE]";

/// One SSE frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    /// Event name
    pub event: &'static str,
    /// Data line (JSON, or `[DONE]`)
    pub data: String,
}

impl WireFrame {
    /// Frame for a generation event; sources are deduplicated by `(title, url)`
    pub fn from_event(event: &GenerationEvent) -> Self {
        match event {
            GenerationEvent::AnswerDelta(text) => Self {
                event: ANSWER_CHUNK_EVENT,
                data: json!({ "content": text }).to_string(),
            },
            GenerationEvent::SourceList(sources) => {
                let unique = CitedSource::dedup(sources.iter().cloned());
                let entries: Vec<Value> = unique
                    .iter()
                    .map(|s| json!({ "title": s.title, "url": s.url }))
                    .collect();
                Self {
                    event: SOURCES_EVENT,
                    data: Value::Array(entries).to_string(),
                }
            }
            GenerationEvent::End => Self {
                event: END_EVENT,
                data: DONE_MARKER.to_string(),
            },
            GenerationEvent::Error(message) => Self {
                event: ERROR_EVENT,
                data: json!({ "error": message }).to_string(),
            },
        }
    }

    /// Raw wire text: `event: <name>\ndata: <data>\n\n`
    pub fn render(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }

    /// Whether this frame ends the stream
    pub fn is_terminal(&self) -> bool {
        self.event == END_EVENT || self.event == ERROR_EVENT
    }
}

impl From<WireFrame> for Event {
    fn from(frame: WireFrame) -> Self {
        Event::default().event(frame.event).data(frame.data)
    }
}

/// Encode generation events as frames, stopping after the first terminal one
pub fn encode<S>(events: S) -> impl Stream<Item = WireFrame> + Send + 'static
where
    S: Stream<Item = GenerationEvent> + Send + 'static,
{
    async_stream::stream! {
        futures::pin_mut!(events);
        while let Some(event) = events.next().await {
            let frame = WireFrame::from_event(&event);
            let terminal = frame.is_terminal();
            yield frame;
            if terminal {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn source(title: &str, url: &str) -> CitedSource {
        CitedSource {
            title: title.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn test_frame_rendering() {
        let frame = WireFrame::from_event(&GenerationEvent::AnswerDelta("Fast\"API\"\n".into()));
        assert_eq!(
            frame.render(),
            "event: answer_chunk\ndata: {\"content\":\"Fast\\\"API\\\"\\n\"}\n\n"
        );

        let end = WireFrame::from_event(&GenerationEvent::End);
        assert_eq!(end.render(), "event: end\ndata: [DONE]\n\n");

        let error = WireFrame::from_event(&GenerationEvent::Error("boom".into()));
        assert_eq!(error.data, r#"{"error":"boom"}"#);
    }

    #[test]
    fn test_sources_deduplicated_in_order() {
        let frame = WireFrame::from_event(&GenerationEvent::SourceList(vec![
            source("Body", "https://b"),
            source("Intro", "https://a"),
            source("Body", "https://b"),
        ]));
        let parsed: Vec<CitedSource> = serde_json::from_str(&frame.data).unwrap();
        assert_eq!(parsed, vec![source("Body", "https://b"), source("Intro", "https://a")]);
    }

    #[tokio::test]
    async fn test_nothing_after_terminal() {
        let events = stream::iter(vec![
            GenerationEvent::SourceList(vec![]),
            GenerationEvent::AnswerDelta("a".into()),
            GenerationEvent::Error("x".into()),
            GenerationEvent::AnswerDelta("late".into()),
            GenerationEvent::End,
        ]);
        let frames: Vec<WireFrame> = encode(events).collect().await;
        let names: Vec<_> = frames.iter().map(|f| f.event).collect();
        assert_eq!(names, vec![SOURCES_EVENT, ANSWER_CHUNK_EVENT, ERROR_EVENT]);
    }
}
