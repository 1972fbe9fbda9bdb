//! Task executor daemon.
//!
//! The [`TaskExecutor`] is a long-running background service that:
//! - Receives compress / resize / cancel requests via a channel
//! - Records cancels in its [`CancellationRegistry`]
//! - Runs each codec call as its own task, capped by a semaphore
//! - Stops reading requests while too many tasks are queued or running
//! - Checks the registry before and after the codec call
//! - Emits exactly one response per task, or none if it was cancelled
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                          TaskExecutor                            │
//! │                                                                  │
//! │  TaskRequest ──► ┌──────────────┐                                │
//! │                  │  Dispatch    │── Cancel ──► registry.cancel() │
//! │                  └──────┬───────┘                                │
//! │                         │ Compress / Resize                      │
//! │                         ▼                                        │
//! │                  ┌──────────────┐                                │
//! │                  │ Acquire slot │── cancelled ──► drop           │
//! │                  └──────┬───────┘                                │
//! │                         ▼                                        │
//! │                  ┌──────────────┐                                │
//! │                  │ CodecAdapter │                                │
//! │                  └──────┬───────┘                                │
//! │                         ▼                                        │
//! │                  ┌──────────────┐                                │
//! │                  │  Finalize    │── cancelled ──► drop           │
//! │                  └──────┬───────┘                                │
//! │                         ▼                                        │
//! │                  TaskResponse (success / classified failure)     │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use pixo_worker::codec::{CompressOptions, ImageCodec, RawImage};
//! use pixo_worker::config::ExecutorConfig;
//! use pixo_worker::executor::TaskExecutor;
//! use pixo_worker::protocol::{TaskId, TaskRequest};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let (executor, mut link) = TaskExecutor::new(ExecutorConfig::default(), Arc::new(ImageCodec::new()));
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(executor.run(shutdown.clone()));
//!
//! let image = RawImage::new(1, 1, vec![255u8, 0, 0, 255]);
//! link.requests
//!     .send(TaskRequest::compress(TaskId::new("a"), image, CompressOptions::png()))
//!     .await
//!     .unwrap();
//! let response = link.responses.recv().await.unwrap();
//! assert!(response.is_success());
//! # }
//! ```

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::classify::classify;
use super::registry::{CancellationRegistry, InFlight};
use super::stats::{ExecutorStats, ExecutorStatsSnapshot};
use crate::codec::{CodecAdapter, CompressOptions, RawImage, ResizeOptions};
use crate::config::ExecutorConfig;
use crate::protocol::{ErrorType, TaskFailure, TaskRequest, TaskResponse, TaskResult};

// =============================================================================
// Channels
// =============================================================================

/// The requester's ends of an executor's channels.
#[derive(Debug)]
pub struct ExecutorLink {
    /// Clone freely; the executor stops once every sender is dropped.
    pub requests: mpsc::Sender<TaskRequest>,

    /// Responses in completion order.
    pub responses: mpsc::Receiver<TaskResponse>,
}

// =============================================================================
// Executor
// =============================================================================

/// The task executor daemon.
///
/// Owns its cancellation registry; two executors never share state.
pub struct TaskExecutor {
    config: ExecutorConfig,
    codec: Arc<dyn CodecAdapter>,
    registry: Arc<CancellationRegistry>,
    stats: Arc<ExecutorStats>,
    request_rx: mpsc::Receiver<TaskRequest>,
    response_tx: mpsc::Sender<TaskResponse>,
}

/// Work a compress or resize request carries into its task.
enum Work {
    Compress(RawImage, CompressOptions),
    Resize(RawImage, ResizeOptions),
}

/// State shared by every task spawned from one executor.
#[derive(Clone)]
struct TaskContext {
    codec: Arc<dyn CodecAdapter>,
    registry: Arc<CancellationRegistry>,
    stats: Arc<ExecutorStats>,
    permits: Arc<Semaphore>,
    responses: mpsc::Sender<TaskResponse>,
}

impl TaskExecutor {
    /// Creates a new executor with its channels.
    ///
    /// Returns the executor and the requester's side of the channels.
    pub fn new(config: ExecutorConfig, codec: Arc<dyn CodecAdapter>) -> (Self, ExecutorLink) {
        let (request_tx, request_rx) = mpsc::channel(config.request_capacity.max(1));
        let (response_tx, response_rx) = mpsc::channel(config.response_capacity.max(1));
        let registry = Arc::new(CancellationRegistry::with_ttl(config.cancellation_ttl));

        let executor = Self {
            config,
            codec,
            registry,
            stats: Arc::new(ExecutorStats::new()),
            request_rx,
            response_tx,
        };

        let link = ExecutorLink {
            requests: request_tx,
            responses: response_rx,
        };

        (executor, link)
    }

    /// This executor's cancellation registry.
    pub fn registry(&self) -> Arc<CancellationRegistry> {
        Arc::clone(&self.registry)
    }

    /// Live counters; stay readable after [`run`](Self::run) consumes the executor.
    pub fn stats(&self) -> Arc<ExecutorStats> {
        Arc::clone(&self.stats)
    }

    /// Runs until shutdown is signalled or every request sender is dropped.
    ///
    /// In-flight tasks then get `shutdown_grace` to finish before they are
    /// aborted. Returns the final counters.
    pub async fn run(self, shutdown: CancellationToken) -> ExecutorStatsSnapshot {
        let Self {
            config,
            codec,
            registry,
            stats,
            mut request_rx,
            response_tx,
        } = self;

        info!(
            codec = codec.name(),
            max_concurrent_tasks = config.max_concurrent_tasks,
            "Task executor starting"
        );

        let ctx = TaskContext {
            codec,
            registry,
            stats: Arc::clone(&stats),
            permits: Arc::new(Semaphore::new(config.max_concurrent_tasks.max(1))),
            responses: response_tx,
        };
        let mut tasks: JoinSet<()> = JoinSet::new();

        // Tasks waiting for a permit hold their buffers in the JoinSet. Past
        // this many, requests stay in the channel and senders see backpressure.
        let max_in_flight = config.max_concurrent_tasks.max(1) + config.request_capacity.max(1);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("Task executor shutting down");
                    break;
                }

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    Self::reap(joined);
                }

                request = request_rx.recv(), if tasks.len() < max_in_flight => match request {
                    Some(request) => Self::handle_request(request, &ctx, &mut tasks),
                    None => {
                        debug!("All request senders dropped");
                        break;
                    }
                },
            }
        }

        // Stop accepting before draining so senders see a closed channel.
        request_rx.close();
        drop(ctx);

        if !tasks.is_empty() {
            debug!(in_flight = tasks.len(), "Waiting for in-flight tasks");
            let drained =
                tokio::time::timeout(config.shutdown_grace, Self::drain(&mut tasks)).await;
            if drained.is_err() {
                warn!(
                    remaining = tasks.len(),
                    grace_ms = config.shutdown_grace.as_millis(),
                    "Shutdown grace elapsed, aborting remaining tasks"
                );
                tasks.abort_all();
                Self::drain(&mut tasks).await;
            }
        }

        let snapshot = stats.snapshot();
        info!(
            requests = snapshot.requests,
            cancels = snapshot.cancels,
            succeeded = snapshot.succeeded,
            failed = snapshot.failed,
            dropped = snapshot.dropped,
            "Task executor stopped"
        );
        snapshot
    }

    fn handle_request(request: TaskRequest, ctx: &TaskContext, tasks: &mut JoinSet<()>) {
        debug!(task_id = %request.id(), kind = request.kind(), "Received request");

        let (id, work) = match request {
            TaskRequest::Cancel(cancel) => {
                ctx.stats.record_cancel();
                ctx.registry.cancel(cancel.id);
                return;
            }
            TaskRequest::Compress(req) => {
                let (id, image, options) = req.into_parts();
                (id, Work::Compress(image, options))
            }
            TaskRequest::Resize(req) => {
                let (id, image, options) = req.into_parts();
                (id, Work::Resize(image, options))
            }
        };

        ctx.stats.record_request();
        let task = ctx.registry.track(id);
        tasks.spawn(Self::run_task(ctx.clone(), task, work));
    }

    /// One task's lifecycle: wait for a slot, run the codec, finalize.
    async fn run_task(ctx: TaskContext, task: InFlight, work: Work) {
        let id = task.id().clone();
        let _permit = match Arc::clone(&ctx.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        if ctx.registry.take(&id) {
            ctx.stats.record_dropped();
            debug!(task_id = %id, "Task cancelled before start, dropped");
            return;
        }

        let start = Instant::now();
        let outcome = Self::execute(Arc::clone(&ctx.codec), work).await;
        let duration_ms = start.elapsed().as_millis();

        // Best effort: a cancel that lands after this check still loses the race.
        if ctx.registry.take(&id) {
            ctx.stats.record_dropped();
            debug!(task_id = %id, duration_ms, "Task cancelled, result dropped");
            return;
        }

        let response = match outcome {
            Ok(result) => {
                ctx.stats.record_success();
                debug!(task_id = %id, duration_ms, "Task succeeded");
                TaskResponse::success(id, result)
            }
            Err(failure) => {
                ctx.stats.record_failure();
                debug!(
                    task_id = %id,
                    duration_ms,
                    error_type = %failure.error_type,
                    error = %failure.message,
                    "Task failed"
                );
                TaskResponse {
                    id,
                    outcome: Err(failure),
                }
            }
        };

        if let Err(e) = ctx.responses.send(response).await {
            warn!(task_id = %e.0.id, "Response channel closed, response discarded");
        }
    }

    /// Runs the codec call on its own task so a panic surfaces as a failure.
    ///
    /// The codec task lives in a set owned by this future, so aborting the
    /// outer task aborts the codec call too.
    async fn execute(codec: Arc<dyn CodecAdapter>, work: Work) -> Result<TaskResult, TaskFailure> {
        let mut codec_task = JoinSet::new();
        codec_task.spawn(async move {
            match work {
                Work::Compress(image, options) => {
                    codec.compress(image, options).await.map(TaskResult::from)
                }
                Work::Resize(image, options) => {
                    codec.resize(image, options).await.map(TaskResult::from)
                }
            }
        });

        match codec_task.join_next().await {
            Some(Ok(Ok(result))) => Ok(result),
            Some(Ok(Err(err))) => {
                let message = err.message().to_string();
                Err(TaskFailure {
                    error_type: classify(&message),
                    message,
                })
            }
            Some(Err(join_err)) => {
                warn!(error = %join_err, "Codec task panicked");
                Err(TaskFailure {
                    message: format!("codec task failed: {}", join_err),
                    error_type: ErrorType::Unknown,
                })
            }
            None => Err(TaskFailure {
                message: "codec task was not started".to_string(),
                error_type: ErrorType::Unknown,
            }),
        }
    }

    async fn drain(tasks: &mut JoinSet<()>) {
        while let Some(joined) = tasks.join_next().await {
            Self::reap(joined);
        }
    }

    fn reap(joined: Result<(), JoinError>) {
        if let Err(e) = joined {
            if e.is_panic() {
                warn!(error = %e, "Task panicked");
            } else {
                debug!(error = %e, "Task aborted");
            }
        }
    }
}

/// Creates an executor and spawns it on the current runtime.
pub fn spawn_executor(
    config: ExecutorConfig,
    codec: Arc<dyn CodecAdapter>,
    shutdown: CancellationToken,
) -> (ExecutorLink, JoinHandle<ExecutorStatsSnapshot>) {
    let (executor, link) = TaskExecutor::new(config, codec);
    let handle = tokio::spawn(executor.run(shutdown));
    (link, handle)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{BoxFuture, CodecError, CompressOutput, ResizeOutput};
    use crate::protocol::TaskId;
    use bytes::Bytes;
    use std::time::Duration;

    /// Mock codec that echoes input sizes and can be told to fail or panic.
    struct MockCodec {
        fail_with: Option<&'static str>,
        panic: bool,
    }

    impl MockCodec {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                fail_with: None,
                panic: false,
            })
        }

        fn failing(message: &'static str) -> Arc<Self> {
            Arc::new(Self {
                fail_with: Some(message),
                panic: false,
            })
        }

        fn panicking() -> Arc<Self> {
            Arc::new(Self {
                fail_with: None,
                panic: true,
            })
        }
    }

    impl CodecAdapter for MockCodec {
        fn name(&self) -> &str {
            "mock"
        }

        fn compress(
            &self,
            image: RawImage,
            _options: CompressOptions,
        ) -> BoxFuture<'_, Result<CompressOutput, CodecError>> {
            Box::pin(async move {
                if self.panic {
                    panic!("codec exploded");
                }
                if let Some(message) = self.fail_with {
                    return Err(CodecError::new(message));
                }
                Ok(CompressOutput {
                    data: Bytes::from(vec![0u8; image.pixels().len() / 4]),
                    elapsed_ms: 0.5,
                })
            })
        }

        fn resize(
            &self,
            _image: RawImage,
            options: ResizeOptions,
        ) -> BoxFuture<'_, Result<ResizeOutput, CodecError>> {
            Box::pin(async move {
                Ok(ResizeOutput {
                    width: options.width,
                    height: options.height,
                    pixels: Bytes::from(vec![0u8; (options.width * options.height * 4) as usize]),
                })
            })
        }
    }

    fn image() -> RawImage {
        RawImage::new(2, 2, vec![0u8; 16])
    }

    async fn recv(link: &mut ExecutorLink) -> TaskResponse {
        tokio::time::timeout(Duration::from_secs(1), link.responses.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_new_opens_channels() {
        let (executor, link) = TaskExecutor::new(ExecutorConfig::default(), MockCodec::ok());
        assert!(!link.requests.is_closed());
        assert!(executor.registry().is_empty());
        assert_eq!(executor.stats().snapshot().requests, 0);
    }

    #[tokio::test]
    async fn test_compress_success() {
        let shutdown = CancellationToken::new();
        let (mut link, handle) =
            spawn_executor(ExecutorConfig::default(), MockCodec::ok(), shutdown.clone());

        link.requests
            .send(TaskRequest::compress(TaskId::new("a"), image(), CompressOptions::png()))
            .await
            .unwrap();

        let response = recv(&mut link).await;
        assert_eq!(response.id.as_str(), "a");
        assert!(response.is_success());

        shutdown.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.succeeded, 1);
    }

    #[tokio::test]
    async fn test_failure_is_classified() {
        let shutdown = CancellationToken::new();
        let (mut link, _handle) = spawn_executor(
            ExecutorConfig::default(),
            MockCodec::failing("allocation of 1 GiB failed"),
            shutdown.clone(),
        );

        link.requests
            .send(TaskRequest::compress(TaskId::new("m"), image(), CompressOptions::png()))
            .await
            .unwrap();

        let response = recv(&mut link).await;
        assert_eq!(response.error_type(), Some(ErrorType::OutOfMemory));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_cancel_before_request_drops_task() {
        let config = ExecutorConfig::default();
        let (executor, mut link) = TaskExecutor::new(config, MockCodec::ok());
        let stats = executor.stats();
        let handle = tokio::spawn(executor.run(CancellationToken::new()));

        link.requests
            .send(TaskRequest::cancel(TaskId::new("early")))
            .await
            .unwrap();
        link.requests
            .send(TaskRequest::compress(TaskId::new("early"), image(), CompressOptions::png()))
            .await
            .unwrap();
        drop(link.requests);

        assert!(link.responses.recv().await.is_none());
        let snapshot = handle.await.unwrap();
        assert_eq!(snapshot.dropped, 1);
        assert_eq!(snapshot, stats.snapshot());
    }

    #[tokio::test]
    async fn test_panic_surfaces_as_unknown_failure() {
        let shutdown = CancellationToken::new();
        let (mut link, _handle) =
            spawn_executor(ExecutorConfig::default(), MockCodec::panicking(), shutdown.clone());

        link.requests
            .send(TaskRequest::compress(TaskId::new("p"), image(), CompressOptions::png()))
            .await
            .unwrap();

        let response = recv(&mut link).await;
        assert_eq!(response.id.as_str(), "p");
        assert_eq!(response.error_type(), Some(ErrorType::Unknown));
        shutdown.cancel();
    }

    #[tokio::test]
    async fn test_cancel_unknown_id_is_noop() {
        let shutdown = CancellationToken::new();
        let (mut link, handle) =
            spawn_executor(ExecutorConfig::default(), MockCodec::ok(), shutdown.clone());

        link.requests
            .send(TaskRequest::cancel(TaskId::new("ghost")))
            .await
            .unwrap();
        link.requests
            .send(TaskRequest::resize(TaskId::new("r"), image(), ResizeOptions::new(3, 3)))
            .await
            .unwrap();

        let response = recv(&mut link).await;
        assert_eq!(response.id.as_str(), "r");

        shutdown.cancel();
        let stats = handle.await.unwrap();
        assert_eq!(stats.cancels, 1);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test]
    async fn test_stops_when_senders_dropped() {
        let (link, handle) = spawn_executor(
            ExecutorConfig::default(),
            MockCodec::ok(),
            CancellationToken::new(),
        );
        drop(link.requests);

        let stats = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stats.requests, 0);
    }
}
