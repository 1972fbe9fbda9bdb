//! Compress and resize options as they appear on the wire.

use serde::{Deserialize, Serialize};

/// Default JPEG quality when a request leaves it out.
pub const DEFAULT_QUALITY: u8 = 80;

/// Default PNG compression preset (0 = fast, 1 = balanced, 2 = smallest).
pub const DEFAULT_PRESET: u8 = 1;

/// Output container format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl ImageFormat {
    /// Conventional file extension.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpg",
        }
    }

    /// Guesses the format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(ImageFormat::Png),
            "jpg" | "jpeg" => Some(ImageFormat::Jpeg),
            _ => None,
        }
    }
}

impl std::fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImageFormat::Png => write!(f, "png"),
            ImageFormat::Jpeg => write!(f, "jpeg"),
        }
    }
}

fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

fn default_preset() -> u8 {
    DEFAULT_PRESET
}

/// Options for a compress task.
///
/// Range checks (quality 1-100, preset 0-2) are left to the codec adapter so
/// that out-of-range values come back as ordinary task failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressOptions {
    pub format: ImageFormat,

    /// Lossy quality (JPEG).
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// Compression effort preset (PNG).
    #[serde(default = "default_preset")]
    pub preset: u8,

    /// Request lossless output.
    #[serde(default)]
    pub lossless: bool,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            format: ImageFormat::Png,
            quality: DEFAULT_QUALITY,
            preset: DEFAULT_PRESET,
            lossless: false,
        }
    }
}

impl CompressOptions {
    /// PNG with the default preset.
    pub fn png() -> Self {
        Self::default()
    }

    /// JPEG at the given quality.
    pub fn jpeg(quality: u8) -> Self {
        Self {
            format: ImageFormat::Jpeg,
            quality,
            ..Self::default()
        }
    }

    /// Set the compression preset.
    pub fn with_preset(mut self, preset: u8) -> Self {
        self.preset = preset;
        self
    }

    /// Set the lossy quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set the lossless flag.
    pub fn with_lossless(mut self, lossless: bool) -> Self {
        self.lossless = lossless;
        self
    }
}

/// Resampling filter for resize tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeAlgorithm {
    Nearest,
    #[default]
    Bilinear,
    Lanczos3,
}

impl std::fmt::Display for ResizeAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResizeAlgorithm::Nearest => write!(f, "nearest"),
            ResizeAlgorithm::Bilinear => write!(f, "bilinear"),
            ResizeAlgorithm::Lanczos3 => write!(f, "lanczos3"),
        }
    }
}

/// Options for a resize task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResizeOptions {
    /// Target width (or bounding-box width with `maintain_aspect_ratio`).
    pub width: u32,

    /// Target height (or bounding-box height with `maintain_aspect_ratio`).
    pub height: u32,

    #[serde(default)]
    pub algorithm: ResizeAlgorithm,

    /// Fit inside `width`×`height` keeping the source ratio.
    #[serde(default)]
    pub maintain_aspect_ratio: bool,
}

impl ResizeOptions {
    /// Exact resize to `width`×`height` with the default filter.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            algorithm: ResizeAlgorithm::default(),
            maintain_aspect_ratio: false,
        }
    }

    /// Set the resampling filter.
    pub fn with_algorithm(mut self, algorithm: ResizeAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the aspect-ratio policy.
    pub fn with_maintain_aspect_ratio(mut self, maintain: bool) -> Self {
        self.maintain_aspect_ratio = maintain;
        self
    }

    /// Computes the output dimensions for a `src_width`×`src_height` source.
    ///
    /// Without `maintain_aspect_ratio` this is the target as given. With it,
    /// the source is scaled to fit inside the target box; each side is at
    /// least 1 pixel.
    pub fn output_dimensions(&self, src_width: u32, src_height: u32) -> (u32, u32) {
        if !self.maintain_aspect_ratio || src_width == 0 || src_height == 0 {
            return (self.width, self.height);
        }

        let scale = f64::min(
            self.width as f64 / src_width as f64,
            self.height as f64 / src_height as f64,
        );

        let width = ((src_width as f64 * scale).round() as u32).clamp(1, self.width.max(1));
        let height = ((src_height as f64 * scale).round() as u32).clamp(1, self.height.max(1));
        (width, height)
    }
}
