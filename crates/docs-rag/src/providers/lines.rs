//! Line framing for streamed HTTP bodies (Ollama NDJSON, OpenAI-style SSE)

use bytes::Bytes;
use futures::{Stream, StreamExt};

use crate::error::{Error, Result};

/// Split a byte stream into lines, buffering across chunk boundaries.
///
/// Network chunks rarely align with lines; a JSON object may arrive in
/// several pieces. Blank lines are skipped and `\r\n` is accepted.
pub fn byte_lines<S, E>(bytes: S) -> impl Stream<Item = Result<String>> + Send + 'static
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    async_stream::try_stream! {
        let mut buffer: Vec<u8> = Vec::new();
        futures::pin_mut!(bytes);

        while let Some(chunk) = bytes.next().await {
            let chunk = chunk.map_err(|e| Error::generation(format!("Stream error: {}", e)))?;
            buffer.extend_from_slice(&chunk);

            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                let line = line.trim_end_matches(|c: char| c == '\n' || c == '\r');
                if !line.trim().is_empty() {
                    yield line.to_string();
                }
            }
        }

        let tail = String::from_utf8_lossy(&buffer);
        if !tail.trim().is_empty() {
            yield tail.trim_end_matches(|c: char| c == '\n' || c == '\r').to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(parts: Vec<&'static str>) -> Vec<String> {
        let input = stream::iter(
            parts
                .into_iter()
                .map(|p| Ok::<_, std::io::Error>(Bytes::from_static(p.as_bytes()))),
        );
        byte_lines(input)
            .map(|line| line.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let lines = collect(vec!["{\"response\":\"Fast", "API\"}\n{\"resp", "onse\":\"!\"}\n"]).await;
        assert_eq!(lines, vec!["{\"response\":\"FastAPI\"}", "{\"response\":\"!\"}"]);
    }

    #[tokio::test]
    async fn test_crlf_blank_lines_and_tail() {
        let lines = collect(vec!["data: a\r\n\r\n", "data: b\n\n", "data: [DONE]"]).await;
        assert_eq!(lines, vec!["data: a", "data: b", "data: [DONE]"]);
    }

    #[tokio::test]
    async fn test_multibyte_split() {
        let bytes = "路径\n".as_bytes();
        let input = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::copy_from_slice(&bytes[..2])),
            Ok(Bytes::copy_from_slice(&bytes[2..])),
        ]);
        let lines: Vec<String> = byte_lines(input).map(|l| l.unwrap()).collect().await;
        assert_eq!(lines, vec!["路径"]);
    }
}
