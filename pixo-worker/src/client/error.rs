//! Client-side dispatch errors.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::{ErrorType, TaskFailure, TaskId};

/// Why a dispatched task produced no result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    /// The executor stopped or its channels closed.
    #[error("executor is not running")]
    ExecutorClosed,

    /// The task was cancelled by this client.
    #[error("task was cancelled")]
    Cancelled,

    #[error("task timed out after {0:?}")]
    Timeout(Duration),

    /// The executor reported a classified failure.
    #[error("{message}")]
    Task {
        message: String,
        error_type: ErrorType,
    },

    #[error("task id {0} is already pending")]
    DuplicateId(TaskId),
}

impl DispatchError {
    /// The failure tag, for executor-reported failures.
    pub fn error_type(&self) -> Option<ErrorType> {
        match self {
            DispatchError::Task { error_type, .. } => Some(*error_type),
            _ => None,
        }
    }
}

impl From<TaskFailure> for DispatchError {
    fn from(failure: TaskFailure) -> Self {
        DispatchError::Task {
            message: failure.message,
            error_type: failure.error_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_failure_conversion_keeps_tag() {
        let err = DispatchError::from(TaskFailure {
            message: "out of memory".to_string(),
            error_type: ErrorType::OutOfMemory,
        });
        assert_eq!(err.error_type(), Some(ErrorType::OutOfMemory));
        assert_eq!(err.to_string(), "out of memory");
    }

    #[test]
    fn test_timeout_display() {
        let err = DispatchError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "task timed out after 250ms");
        assert!(err.error_type().is_none());
    }
}
