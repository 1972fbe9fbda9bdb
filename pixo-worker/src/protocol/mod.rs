//! Message contracts between the dispatch client and the task executor.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐   TaskRequest (compress / resize / cancel)   ┌──────────────┐
//! │ DispatchClient │ ───────────────────────────────────────────► │ TaskExecutor │
//! │                │ ◄─────────────────────────────────────────── │              │
//! └────────────────┘   TaskResponse (success / failure / nothing) └──────────────┘
//! ```
//!
//! Every type here is transport-agnostic. In process the values travel
//! through tokio channels as-is; the JSON-lines transport serializes them
//! with the field names below.
//!
//! ```text
//! {"id":"a","type":"compress","width":10,"height":10,"data":[...],"options":{"format":"png"}}
//! {"id":"a","success":true,"result":{"data":[...],"elapsedMs":1.2}}
//! {"id":"d","success":false,"error":"WASM module failed to load","errorType":"wasm_init"}
//! ```

mod id;
mod request;
mod response;

pub use id::TaskId;
pub use request::{CancelRequest, CompressRequest, ResizeRequest, TaskRequest};
pub use response::{
    CompressResult, ErrorType, ProtocolError, ResizeResult, TaskFailure, TaskResponse, TaskResult,
};
