//! The [`CodecAdapter`] trait and the values that cross it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use thiserror::Error;

use super::options::{CompressOptions, ResizeOptions};

/// Bytes per pixel for the RGBA8 layout used on both sides of the adapter.
pub const BYTES_PER_PIXEL: usize = 4;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A typed view over a raw RGBA8 pixel buffer.
///
/// Construction does not validate that the buffer length matches the
/// dimensions. That check belongs to the codec adapter, which is the only
/// component that knows how it will read the pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct RawImage {
    width: u32,
    height: u32,
    pixels: Bytes,
}

impl RawImage {
    /// Wraps a pixel buffer. Takes ownership; no bytes are copied.
    pub fn new(width: u32, height: u32, pixels: impl Into<Bytes>) -> Self {
        Self {
            width,
            height,
            pixels: pixels.into(),
        }
    }

    /// Image width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Image height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The raw pixel bytes.
    pub fn pixels(&self) -> &Bytes {
        &self.pixels
    }

    /// Consumes the view, returning the pixel buffer.
    pub fn into_pixels(self) -> Bytes {
        self.pixels
    }

    /// Number of pixels (`width * height`).
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Buffer length the dimensions call for, or `None` on overflow.
    pub fn expected_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(BYTES_PER_PIXEL)
    }

    /// Returns true if the buffer length matches the dimensions.
    pub fn has_valid_len(&self) -> bool {
        self.expected_len() == Some(self.pixels.len())
    }
}

impl fmt::Debug for RawImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("len", &self.pixels.len())
            .finish()
    }
}

/// Result of a compress call.
#[derive(Debug, Clone, PartialEq)]
pub struct CompressOutput {
    /// Encoded file bytes (PNG, JPEG, ...).
    pub data: Bytes,
    /// Wall time the codec spent encoding, in milliseconds.
    pub elapsed_ms: f64,
}

/// Result of a resize call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeOutput {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels of the resized image.
    pub pixels: Bytes,
}

/// Free-text failure reported by a codec adapter.
///
/// Adapters do not emit structured error kinds; callers that need a
/// category derive one from the message (see `executor::classify`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CodecError {
    message: String,
}

impl CodecError {
    /// Creates an error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The failure description as reported by the adapter.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Image compress/resize capability consumed by the executor.
///
/// Implementations must be cheap to share (`Arc<dyn CodecAdapter>`) and must
/// report every failure as a [`CodecError`] rather than panicking. CPU-heavy
/// work should be moved off the async worker threads (see
/// [`ImageCodec`](super::ImageCodec), which uses `spawn_blocking`).
///
/// Uses `Pin<Box<dyn Future>>` so the trait stays object safe.
pub trait CodecAdapter: Send + Sync + 'static {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Encodes `image` according to `options`.
    fn compress(
        &self,
        image: RawImage,
        options: CompressOptions,
    ) -> BoxFuture<'_, Result<CompressOutput, CodecError>>;

    /// Resamples `image` to the dimensions described by `options`.
    fn resize(
        &self,
        image: RawImage,
        options: ResizeOptions,
    ) -> BoxFuture<'_, Result<ResizeOutput, CodecError>>;
}
