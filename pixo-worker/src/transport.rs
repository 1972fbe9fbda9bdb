//! Newline-delimited JSON transport for an executor.
//!
//! Lets a separate process drive an executor over a byte stream: one
//! [`TaskRequest`] per input line, one [`TaskResponse`] per output line.
//!
//! ```text
//! reader ── line ──► parse ──► ExecutorLink.requests ──► TaskExecutor
//!                      │                                      │
//!                      └─ malformed (id found) ─┐             │
//!                                               ▼             ▼
//! writer ◄──────────────────────────── line ◄── TaskResponse ◄┘
//! ```
//!
//! When the reader hits EOF the request side is closed; the session ends
//! after the executor has emitted its last response.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::executor::ExecutorLink;
use crate::protocol::{ErrorType, TaskId, TaskRequest, TaskResponse};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode response: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Serves one JSON-lines session until input EOF and executor drain.
pub async fn serve_json_lines<R, W>(
    reader: R,
    mut writer: W,
    link: ExecutorLink,
) -> Result<(), TransportError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let ExecutorLink {
        requests,
        mut responses,
    } = link;
    let mut requests = Some(requests);
    let mut lines = reader.lines();

    loop {
        tokio::select! {
            line = lines.next_line(), if requests.is_some() => match line? {
                Some(line) => {
                    if let Some(tx) = &requests {
                        if !forward_line(&line, tx, &mut writer).await? {
                            requests = None;
                        }
                    }
                }
                None => {
                    debug!("Input closed, draining executor");
                    requests = None;
                }
            },

            response = responses.recv() => match response {
                Some(response) => write_response(&mut writer, &response).await?,
                None => break,
            },
        }
    }

    writer.flush().await?;
    Ok(())
}

/// Parses one line and forwards it. Returns `false` once the executor is gone.
async fn forward_line<W>(
    line: &str,
    requests: &mpsc::Sender<TaskRequest>,
    writer: &mut W,
) -> Result<bool, TransportError>
where
    W: AsyncWrite + Unpin,
{
    let line = line.trim();
    if line.is_empty() {
        return Ok(true);
    }

    let request = match serde_json::from_str::<TaskRequest>(line) {
        Ok(request) => request,
        Err(e) => {
            match extract_id(line) {
                Some(id) => {
                    warn!(task_id = %id, error = %e, "Malformed request");
                    let response = TaskResponse::failure(
                        id,
                        format!("invalid request: {}", e),
                        ErrorType::Unknown,
                    );
                    write_response(writer, &response).await?;
                }
                None => warn!(error = %e, "Malformed request without id, ignored"),
            }
            return Ok(true);
        }
    };

    if requests.send(request).await.is_err() {
        warn!("Executor stopped, no longer reading input");
        return Ok(false);
    }
    Ok(true)
}

/// Best-effort id recovery from a line that failed to parse as a request.
fn extract_id(line: &str) -> Option<TaskId> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get("id")?.as_str().map(TaskId::from)
}

async fn write_response<W>(writer: &mut W, response: &TaskResponse) -> Result<(), TransportError>
where
    W: AsyncWrite + Unpin,
{
    let mut line = serde_json::to_vec(response)?;
    line.push(b'\n');
    writer.write_all(&line).await?;
    writer.flush().await?;
    Ok(())
}
