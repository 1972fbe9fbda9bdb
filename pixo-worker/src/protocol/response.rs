//! Responses emitted by the executor.
//!
//! In memory a response is `id + Result<TaskResult, TaskFailure>`, which makes
//! "both success and error" unrepresentable. On the wire it flattens to
//! `{id, success, result?, error?, errorType?}`; the conversion lives in
//! [`WireResponse`].

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::TaskId;
use crate::codec::{CompressOutput, ResizeOutput};

// =============================================================================
// Error taxonomy
// =============================================================================

/// Stable failure category attached to every failure response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// The codec runtime or module could not be initialized.
    WasmInit,
    /// The codec ran out of memory or refused an allocation.
    OutOfMemory,
    Unknown,
}

impl ErrorType {
    /// Wire name of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::WasmInit => "wasm_init",
            ErrorType::OutOfMemory => "out_of_memory",
            ErrorType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified task failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub message: String,
    pub error_type: ErrorType,
}

// =============================================================================
// Result payloads
// =============================================================================

/// Output of a compress task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressResult {
    /// Encoded file bytes.
    pub data: Bytes,
    pub elapsed_ms: f64,
}

impl From<CompressOutput> for CompressResult {
    fn from(output: CompressOutput) -> Self {
        Self {
            data: output.data,
            elapsed_ms: output.elapsed_ms,
        }
    }
}

/// Output of a resize task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeResult {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels of the resized image.
    pub data: Bytes,
}

impl From<ResizeOutput> for ResizeResult {
    fn from(output: ResizeOutput) -> Self {
        Self {
            width: output.width,
            height: output.height,
            data: output.pixels,
        }
    }
}

/// Success payload.
///
/// Untagged on the wire; `Resize` is tried first because its shape is the
/// stricter of the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskResult {
    Resize(ResizeResult),
    Compress(CompressResult),
}

impl TaskResult {
    /// Payload bytes (encoded file or resized pixels).
    pub fn data(&self) -> &Bytes {
        match self {
            TaskResult::Resize(r) => &r.data,
            TaskResult::Compress(c) => &c.data,
        }
    }
}

impl From<CompressOutput> for TaskResult {
    fn from(output: CompressOutput) -> Self {
        TaskResult::Compress(output.into())
    }
}

impl From<ResizeOutput> for TaskResult {
    fn from(output: ResizeOutput) -> Self {
        TaskResult::Resize(output.into())
    }
}

// =============================================================================
// Response
// =============================================================================

/// Errors converting a wire response into a [`TaskResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("response {0} has success=true but no result")]
    MissingResult(TaskId),

    #[error("response {0} has success=false but no error message")]
    MissingError(TaskId),
}

/// One response, correlated to its request by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "WireResponse", try_from = "WireResponse")]
pub struct TaskResponse {
    pub id: TaskId,
    pub outcome: Result<TaskResult, TaskFailure>,
}

impl TaskResponse {
    pub fn success(id: TaskId, result: impl Into<TaskResult>) -> Self {
        Self {
            id,
            outcome: Ok(result.into()),
        }
    }

    pub fn failure(id: TaskId, message: impl Into<String>, error_type: ErrorType) -> Self {
        Self {
            id,
            outcome: Err(TaskFailure {
                message: message.into(),
                error_type,
            }),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The failure tag, if this is a failure.
    pub fn error_type(&self) -> Option<ErrorType> {
        self.outcome.as_ref().err().map(|f| f.error_type)
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireResponse {
    id: TaskId,
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    result: Option<TaskResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_type: Option<ErrorType>,
}

impl From<TaskResponse> for WireResponse {
    fn from(response: TaskResponse) -> Self {
        match response.outcome {
            Ok(result) => WireResponse {
                id: response.id,
                success: true,
                result: Some(result),
                error: None,
                error_type: None,
            },
            Err(failure) => WireResponse {
                id: response.id,
                success: false,
                result: None,
                error: Some(failure.message),
                error_type: Some(failure.error_type),
            },
        }
    }
}

impl TryFrom<WireResponse> for TaskResponse {
    type Error = ProtocolError;

    fn try_from(wire: WireResponse) -> Result<Self, Self::Error> {
        let outcome = if wire.success {
            match wire.result {
                Some(result) => Ok(result),
                None => return Err(ProtocolError::MissingResult(wire.id)),
            }
        } else {
            match wire.error {
                Some(message) => Err(TaskFailure {
                    message,
                    // Older peers may omit the tag.
                    error_type: wire.error_type.unwrap_or(ErrorType::Unknown),
                }),
                None => return Err(ProtocolError::MissingError(wire.id)),
            }
        };
        Ok(TaskResponse {
            id: wire.id,
            outcome,
        })
    }
}
