//! Dispatch client: the requester's side of the executor boundary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ submit  ┌────────────────┐  TaskRequest   ┌──────────────┐
//! │   TaskSlot   │───────► │ DispatchClient │ ─────────────► │ TaskExecutor │
//! └──────────────┘ cancel  │  pending map   │                └──────┬───────┘
//!                          └───────▲────────┘                       │
//!                                  │ route by id      TaskResponse  │
//!                          ┌───────┴────────┐ ◄─────────────────────┘
//!                          │ response router│
//!                          └────────────────┘
//! ```
//!
//! Every submission gets a fresh [`TaskId`](crate::protocol::TaskId) and a
//! [`PendingTask`] that resolves exactly once: with the result, a classified
//! failure, [`DispatchError::Cancelled`] as soon as the client cancels it, or
//! [`DispatchError::ExecutorClosed`].

mod dispatch;
mod error;
mod slot;

pub use dispatch::{DispatchClient, ImageJob, PendingTask};
pub use error::DispatchError;
pub use slot::TaskSlot;
