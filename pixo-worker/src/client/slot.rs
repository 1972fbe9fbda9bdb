//! Latest-wins task slot.

use super::dispatch::{DispatchClient, ImageJob, PendingTask};
use super::error::DispatchError;
use crate::protocol::TaskId;

/// Holds at most one live task; each submission supersedes the previous one.
///
/// Meant for inputs that fire repeatedly (a quality slider, a resize drag):
/// the superseded task is cancelled before its replacement is sent, so its
/// result never arrives and its waiter resolves with
/// [`DispatchError::Cancelled`].
#[derive(Clone)]
pub struct TaskSlot {
    client: DispatchClient,
    current: Option<TaskId>,
}

impl TaskSlot {
    pub fn new(client: DispatchClient) -> Self {
        Self {
            client,
            current: None,
        }
    }

    /// Cancels the current task, if still pending, then submits `job`.
    pub async fn replace(&mut self, job: ImageJob) -> Result<PendingTask, DispatchError> {
        self.clear().await?;

        let pending = self.client.submit(job).await?;
        self.current = Some(pending.id().clone());
        Ok(pending)
    }

    /// Cancels the current task, if still pending.
    pub async fn clear(&mut self) -> Result<(), DispatchError> {
        if let Some(previous) = self.current.take() {
            // A task whose response already arrived needs no cancel.
            if self.client.is_pending(&previous) {
                self.client.cancel(&previous).await?;
            }
        }
        Ok(())
    }

    /// Id of the most recently submitted task.
    pub fn current(&self) -> Option<&TaskId> {
        self.current.as_ref()
    }
}
