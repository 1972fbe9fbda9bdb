//! Requests sent to the executor.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use super::id::TaskId;
use crate::codec::{CompressOptions, RawImage, ResizeOptions};

/// A message for the executor, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TaskRequest {
    Compress(CompressRequest),
    Resize(ResizeRequest),
    Cancel(CancelRequest),
}

impl TaskRequest {
    /// Builds a compress request, moving the image buffer into it.
    pub fn compress(id: TaskId, image: RawImage, options: CompressOptions) -> Self {
        let (width, height) = (image.width(), image.height());
        Self::Compress(CompressRequest {
            id,
            width,
            height,
            data: image.into_pixels(),
            options,
        })
    }

    /// Builds a resize request, moving the image buffer into it.
    pub fn resize(id: TaskId, image: RawImage, options: ResizeOptions) -> Self {
        let (width, height) = (image.width(), image.height());
        Self::Resize(ResizeRequest {
            id,
            width,
            height,
            data: image.into_pixels(),
            options,
        })
    }

    /// Builds a cancel request.
    pub fn cancel(id: TaskId) -> Self {
        Self::Cancel(CancelRequest { id })
    }

    /// The task id this message refers to.
    pub fn id(&self) -> &TaskId {
        match self {
            Self::Compress(r) => &r.id,
            Self::Resize(r) => &r.id,
            Self::Cancel(r) => &r.id,
        }
    }

    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Compress(_) => "compress",
            Self::Resize(_) => "resize",
            Self::Cancel(_) => "cancel",
        }
    }
}

/// Encode a raw image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompressRequest {
    pub id: TaskId,
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, `width * height * 4` bytes.
    pub data: Bytes,
    pub options: CompressOptions,
}

impl CompressRequest {
    /// Splits the request into its id, a typed image view and the options.
    pub fn into_parts(self) -> (TaskId, RawImage, CompressOptions) {
        (
            self.id,
            RawImage::new(self.width, self.height, self.data),
            self.options,
        )
    }
}

/// Resample a raw image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResizeRequest {
    pub id: TaskId,
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixels, `width * height * 4` bytes.
    pub data: Bytes,
    pub options: ResizeOptions,
}

impl ResizeRequest {
    /// Splits the request into its id, a typed image view and the options.
    pub fn into_parts(self) -> (TaskId, RawImage, ResizeOptions) {
        (
            self.id,
            RawImage::new(self.width, self.height, self.data),
            self.options,
        )
    }
}

/// Mark a task so its result is discarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelRequest {
    pub id: TaskId,
}
