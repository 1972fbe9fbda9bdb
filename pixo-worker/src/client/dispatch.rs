//! Requester side of an executor.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::DispatchError;
use crate::codec::{CodecAdapter, CompressOptions, RawImage, ResizeOptions};
use crate::config::ExecutorConfig;
use crate::executor::{spawn_executor, ExecutorLink, ExecutorStatsSnapshot};
use crate::protocol::{TaskId, TaskRequest, TaskResponse, TaskResult};

type Outcome = Result<TaskResult, DispatchError>;
type PendingMap = Arc<Mutex<HashMap<TaskId, oneshot::Sender<Outcome>>>>;

/// Work to dispatch.
#[derive(Debug, Clone)]
pub enum ImageJob {
    Compress {
        image: RawImage,
        options: CompressOptions,
    },
    Resize {
        image: RawImage,
        options: ResizeOptions,
    },
}

impl ImageJob {
    fn into_request(self, id: TaskId) -> TaskRequest {
        match self {
            ImageJob::Compress { image, options } => TaskRequest::compress(id, image, options),
            ImageJob::Resize { image, options } => TaskRequest::resize(id, image, options),
        }
    }
}

/// Handle for submitting work to a [`TaskExecutor`](crate::executor::TaskExecutor).
///
/// Generates ids, keeps one waiter per in-flight id and routes responses to
/// them. Cheap to clone; clones share the same pending set.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use pixo_worker::client::DispatchClient;
/// use pixo_worker::codec::{ImageCodec, RawImage, ResizeOptions};
/// use pixo_worker::config::ExecutorConfig;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), pixo_worker::client::DispatchError> {
/// let shutdown = CancellationToken::new();
/// let (client, _executor) =
///     DispatchClient::spawn(ExecutorConfig::default(), Arc::new(ImageCodec::new()), shutdown);
///
/// let image = RawImage::new(2, 2, vec![0u8; 16]);
/// let result = client.resize(image, ResizeOptions::new(1, 1)).await?.wait().await?;
/// assert_eq!(result.data().len(), 4);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DispatchClient {
    requests: mpsc::Sender<TaskRequest>,
    pending: PendingMap,
}

impl DispatchClient {
    /// Wraps an executor link and starts the response router.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(link: ExecutorLink) -> Self {
        let ExecutorLink {
            requests,
            responses,
        } = link;
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

        tokio::spawn(route_responses(responses, Arc::clone(&pending)));

        Self { requests, pending }
    }

    /// Spawns a fresh executor and returns a client for it.
    pub fn spawn(
        config: ExecutorConfig,
        codec: Arc<dyn CodecAdapter>,
        shutdown: CancellationToken,
    ) -> (Self, JoinHandle<ExecutorStatsSnapshot>) {
        let (link, handle) = spawn_executor(config, codec, shutdown);
        (Self::new(link), handle)
    }

    /// Submits a job under a freshly generated id.
    pub async fn submit(&self, job: ImageJob) -> Result<PendingTask, DispatchError> {
        self.submit_with_id(TaskId::generate(), job).await
    }

    /// Submits a job under a caller-chosen id.
    ///
    /// Fails with [`DispatchError::DuplicateId`] while another task with the
    /// same id is still pending.
    pub async fn submit_with_id(
        &self,
        id: TaskId,
        job: ImageJob,
    ) -> Result<PendingTask, DispatchError> {
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock();
            if pending.contains_key(&id) {
                return Err(DispatchError::DuplicateId(id));
            }
            pending.insert(id.clone(), tx);
        }

        debug!(task_id = %id, "Submitting task");
        if self.requests.send(job.into_request(id.clone())).await.is_err() {
            self.pending.lock().remove(&id);
            return Err(DispatchError::ExecutorClosed);
        }

        Ok(PendingTask {
            id,
            rx,
            client: self.clone(),
        })
    }

    pub async fn compress(
        &self,
        image: RawImage,
        options: CompressOptions,
    ) -> Result<PendingTask, DispatchError> {
        self.submit(ImageJob::Compress { image, options }).await
    }

    pub async fn resize(
        &self,
        image: RawImage,
        options: ResizeOptions,
    ) -> Result<PendingTask, DispatchError> {
        self.submit(ImageJob::Resize { image, options }).await
    }

    /// Cancels `id` at the executor.
    ///
    /// A local waiter for `id` resolves with [`DispatchError::Cancelled`]
    /// immediately. Returns whether such a waiter existed. Ids with no waiter
    /// (finished, already cancelled, never submitted) are a no-op and send
    /// nothing, so a later task reusing the id is unaffected.
    pub async fn cancel(&self, id: &TaskId) -> Result<bool, DispatchError> {
        let Some(tx) = self.pending.lock().remove(id) else {
            debug!(task_id = %id, "Cancel for task not pending, ignored");
            return Ok(false);
        };
        let _ = tx.send(Err(DispatchError::Cancelled));

        debug!(task_id = %id, "Cancelling task");
        self.requests
            .send(TaskRequest::cancel(id.clone()))
            .await
            .map_err(|_| DispatchError::ExecutorClosed)?;
        Ok(true)
    }

    /// Whether a response for `id` is still awaited.
    pub fn is_pending(&self, id: &TaskId) -> bool {
        self.pending.lock().contains_key(id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

/// Delivers each response to its waiter until the executor closes.
async fn route_responses(mut responses: mpsc::Receiver<TaskResponse>, pending: PendingMap) {
    while let Some(response) = responses.recv().await {
        let TaskResponse { id, outcome } = response;
        let waiter = pending.lock().remove(&id);
        match waiter {
            Some(tx) => {
                let _ = tx.send(outcome.map_err(DispatchError::from));
            }
            None => debug!(task_id = %id, "Discarding response for task no longer pending"),
        }
    }

    let orphaned: Vec<_> = pending.lock().drain().collect();
    if !orphaned.is_empty() {
        warn!(count = orphaned.len(), "Executor closed with tasks still pending");
    }
    for (_, tx) in orphaned {
        let _ = tx.send(Err(DispatchError::ExecutorClosed));
    }
}

/// A submitted task awaiting its response.
#[must_use = "dropping a PendingTask discards its result"]
pub struct PendingTask {
    id: TaskId,
    rx: oneshot::Receiver<Outcome>,
    client: DispatchClient,
}

impl std::fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingTask").field("id", &self.id).finish()
    }
}

impl PendingTask {
    pub fn id(&self) -> &TaskId {
        &self.id
    }

    /// Waits for the task's outcome.
    pub async fn wait(self) -> Result<TaskResult, DispatchError> {
        self.rx.await.unwrap_or(Err(DispatchError::ExecutorClosed))
    }

    /// Waits at most `timeout`, cancelling the task at the executor when it
    /// elapses.
    pub async fn wait_timeout(self, timeout: Duration) -> Result<TaskResult, DispatchError> {
        let Self { id, mut rx, client } = self;

        match tokio::time::timeout(timeout, &mut rx).await {
            Ok(outcome) => outcome.unwrap_or(Err(DispatchError::ExecutorClosed)),
            Err(_) => {
                debug!(task_id = %id, timeout_ms = timeout.as_millis(), "Task timed out");
                // The executor may already be gone; the timeout is what matters.
                let _ = client.cancel(&id).await;
                Err(DispatchError::Timeout(timeout))
            }
        }
    }
}
