//! Codec adapter seam.
//!
//! The executor never encodes pixels itself. It hands a [`RawImage`] to a
//! [`CodecAdapter`] and waits for the result, so any encoder (native, WASM,
//! a test double) can be plugged in without touching the dispatch layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │    TaskExecutor     │
//! │                     │
//! │ Arc<dyn CodecAdapter>
//! └──────────┬──────────┘
//!            │
//!            ▼
//! ┌─────────────────────┐
//! │    CodecAdapter     │ (trait)
//! └──────────┬──────────┘
//!            │
//!       ┌────┴────┐
//!       ▼         ▼
//! ┌──────────┐ ┌──────────┐
//! │ImageCodec│ │  Test    │
//! │ (image)  │ │ doubles  │
//! └──────────┘ └──────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use pixo_worker::codec::{CodecAdapter, ImageCodec};
//! use std::sync::Arc;
//!
//! let codec: Arc<dyn CodecAdapter> = Arc::new(ImageCodec::new());
//! assert_eq!(codec.name(), "image");
//! ```

mod adapter;
mod image_codec;
mod options;

pub use adapter::{
    BoxFuture, CodecAdapter, CodecError, CompressOutput, RawImage, ResizeOutput, BYTES_PER_PIXEL,
};
pub use image_codec::{ImageCodec, DEFAULT_MAX_PIXELS};
pub use options::{
    CompressOptions, ImageFormat, ResizeAlgorithm, ResizeOptions, DEFAULT_PRESET, DEFAULT_QUALITY,
};
