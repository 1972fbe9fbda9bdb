//! pixo-worker - background execution for image compress/resize tasks
//!
//! This library moves image encoding and resampling off the caller's path
//! into a [`TaskExecutor`](executor::TaskExecutor), tracks each task by id,
//! drops results of cancelled tasks and reports failures with a stable
//! [`ErrorType`](protocol::ErrorType).
//!
//! # High-Level API
//!
//! For most use cases, the [`client`] module provides the requester side:
//!
//! ```ignore
//! use pixo_worker::client::{DispatchClient, ImageJob, TaskSlot};
//! use pixo_worker::codec::ImageCodec;
//!
//! let (client, _executor) = DispatchClient::spawn(config, Arc::new(ImageCodec::new()), shutdown);
//!
//! // Each slider move supersedes the previous request
//! let mut slot = TaskSlot::new(client);
//! let pending = slot.replace(ImageJob::Compress { image, options }).await?;
//! let result = pending.wait().await?;
//! ```

pub mod client;
pub mod codec;
pub mod config;
pub mod executor;
pub mod logging;
pub mod protocol;
pub mod transport;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
