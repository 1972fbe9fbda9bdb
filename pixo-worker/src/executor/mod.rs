//! Background task execution.
//!
//! - [`TaskExecutor`] - daemon that runs compress / resize requests
//! - [`CancellationRegistry`] - ids whose results must be dropped
//! - [`classify`] - free-text failure to [`ErrorType`](crate::protocol::ErrorType)
//! - [`ExecutorStats`] - counters reported on shutdown

mod classify;
mod daemon;
mod registry;
mod stats;

pub use classify::classify;
pub use daemon::{spawn_executor, ExecutorLink, TaskExecutor};
pub use registry::CancellationRegistry;
pub use stats::{ExecutorStats, ExecutorStatsSnapshot};
