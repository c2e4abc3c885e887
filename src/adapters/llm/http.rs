//! HTTP plumbing shared by the provider adapters.

use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::sync::mpsc;

use crate::domain::ports::{LlmError, TokenStream, STREAM_BUFFER};

/// What one line of a streaming body means to the caller.
#[derive(Debug)]
pub(crate) enum LineEvent {
    Token(String),
    Skip,
    Done,
    Fail(LlmError),
}

pub(crate) fn build_client(provider: &str) -> Result<Client, LlmError> {
    Client::builder()
        .build()
        .map_err(|e| LlmError::configuration(provider, format!("Failed to create HTTP client: {e}")))
}

/// Turn a non-2xx response into [`LlmError::Api`] with the body as message.
pub(crate) async fn ensure_success(provider: &str, response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(LlmError::Api {
        provider: provider.to_string(),
        status: status.as_u16(),
        message: body,
    })
}

/// Read a streaming body line by line on a background task.
///
/// `parse` maps each line (without the trailing newline) to a [`LineEvent`].
/// Tokens are forwarded in arrival order; the stream ends at `Done`, at the
/// first failure, at end of body, or when the receiver is dropped.
pub(crate) fn spawn_line_stream<F>(provider: &'static str, response: Response, mut parse: F) -> TokenStream
where
    F: FnMut(&str) -> LineEvent + Send + 'static,
{
    let (tx, rx) = mpsc::channel(STREAM_BUFFER);

    tokio::spawn(async move {
        let mut body = response.bytes_stream();
        let mut pending: Vec<u8> = Vec::new();

        while let Some(item) = body.next().await {
            let bytes = match item {
                Ok(bytes) => bytes,
                Err(e) => {
                    let _ = tx
                        .send(Err(LlmError::Connection {
                            provider: provider.to_string(),
                            message: format!("stream interrupted: {e}"),
                        }))
                        .await;
                    return;
                }
            };
            pending.extend_from_slice(&bytes);

            while let Some(pos) = pending.iter().position(|b| *b == b'\n') {
                let raw: Vec<u8> = pending.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw);
                if !forward(&tx, parse(line.trim_end_matches(['\r', '\n']))).await {
                    return;
                }
            }
        }

        if !pending.is_empty() {
            let line = String::from_utf8_lossy(&pending).to_string();
            forward(&tx, parse(line.trim_end_matches('\r'))).await;
        }
    });

    rx
}

/// Returns `false` once the stream should stop.
async fn forward(tx: &mpsc::Sender<Result<String, LlmError>>, event: LineEvent) -> bool {
    match event {
        LineEvent::Token(text) => tx.send(Ok(text)).await.is_ok(),
        LineEvent::Skip => true,
        LineEvent::Done => false,
        LineEvent::Fail(err) => {
            let _ = tx.send(Err(err)).await;
            false
        }
    }
}

/// Payload of an SSE `data:` line, `None` for comments, events and blanks.
pub(crate) fn sse_data(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}
