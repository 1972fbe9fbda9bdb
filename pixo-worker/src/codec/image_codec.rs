//! Reference [`CodecAdapter`] built on the `image` crate.
//!
//! Encodes RGBA8 buffers to PNG or JPEG and resamples them with the
//! nearest / triangle / Lanczos3 filters. All pixel work runs on tokio's
//! blocking pool so the executor loop keeps accepting requests while an
//! encode is in progress.

use std::time::Instant;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageError, RgbaImage};

use super::adapter::{BoxFuture, CodecAdapter, CodecError, CompressOutput, RawImage, ResizeOutput};
use super::options::{CompressOptions, ImageFormat, ResizeAlgorithm, ResizeOptions};
use crate::config::CodecConfig;

/// Default cap on source and target pixel counts (100 megapixels).
pub const DEFAULT_MAX_PIXELS: u64 = 100_000_000;

/// `image`-crate codec adapter.
///
/// # Example
///
/// ```
/// use pixo_worker::codec::{CodecAdapter, ImageCodec};
///
/// let codec = ImageCodec::new().with_max_pixels(4096 * 4096);
/// assert_eq!(codec.max_pixels(), 4096 * 4096);
/// ```
#[derive(Debug, Clone)]
pub struct ImageCodec {
    max_pixels: u64,
}

impl Default for ImageCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCodec {
    /// Creates a codec with [`DEFAULT_MAX_PIXELS`].
    pub fn new() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }

    /// Creates a codec from the `[codec]` configuration section.
    pub fn from_config(config: &CodecConfig) -> Self {
        Self::new().with_max_pixels(config.max_pixels)
    }

    /// Set the pixel-count limit for source and output images.
    ///
    /// Images above the limit are rejected with a memory error instead of
    /// attempting the allocation.
    pub fn with_max_pixels(mut self, max_pixels: u64) -> Self {
        self.max_pixels = max_pixels;
        self
    }

    /// The configured pixel-count limit.
    pub fn max_pixels(&self) -> u64 {
        self.max_pixels
    }

    fn encode(
        image: RawImage,
        options: CompressOptions,
        max_pixels: u64,
    ) -> Result<CompressOutput, CodecError> {
        validate_compress_options(&options)?;
        let start = Instant::now();
        let rgba = to_rgba(image, max_pixels)?;

        let data = match options.format {
            ImageFormat::Png => encode_png(&rgba, options.preset)?,
            ImageFormat::Jpeg => encode_jpeg(rgba, options.quality)?,
        };

        Ok(CompressOutput {
            data: Bytes::from(data),
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }

    fn resample(
        image: RawImage,
        options: ResizeOptions,
        max_pixels: u64,
    ) -> Result<ResizeOutput, CodecError> {
        if options.width == 0 || options.height == 0 {
            return Err(CodecError::new(format!(
                "invalid target dimensions {}×{}: width and height must be non-zero",
                options.width, options.height
            )));
        }

        let (width, height) = options.output_dimensions(image.width(), image.height());
        check_pixel_limit(width, height, max_pixels)?;

        let rgba = to_rgba(image, max_pixels)?;
        let filter = match options.algorithm {
            ResizeAlgorithm::Nearest => FilterType::Nearest,
            ResizeAlgorithm::Bilinear => FilterType::Triangle,
            ResizeAlgorithm::Lanczos3 => FilterType::Lanczos3,
        };

        let resized = imageops::resize(&rgba, width, height, filter);

        Ok(ResizeOutput {
            width,
            height,
            pixels: Bytes::from(resized.into_raw()),
        })
    }
}

impl CodecAdapter for ImageCodec {
    fn name(&self) -> &str {
        "image"
    }

    fn compress(
        &self,
        image: RawImage,
        options: CompressOptions,
    ) -> BoxFuture<'_, Result<CompressOutput, CodecError>> {
        let max_pixels = self.max_pixels;
        Box::pin(run_blocking(move || Self::encode(image, options, max_pixels)))
    }

    fn resize(
        &self,
        image: RawImage,
        options: ResizeOptions,
    ) -> BoxFuture<'_, Result<ResizeOutput, CodecError>> {
        let max_pixels = self.max_pixels;
        Box::pin(run_blocking(move || Self::resample(image, options, max_pixels)))
    }
}

/// Runs CPU-bound codec work on the blocking pool.
async fn run_blocking<T, F>(op: F) -> Result<T, CodecError>
where
    F: FnOnce() -> Result<T, CodecError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| CodecError::new(format!("codec worker stopped: {}", e)))?
}

fn validate_compress_options(options: &CompressOptions) -> Result<(), CodecError> {
    if !(1..=100).contains(&options.quality) {
        return Err(CodecError::new(format!(
            "invalid quality {}: expected 1-100",
            options.quality
        )));
    }
    if options.preset > 2 {
        return Err(CodecError::new(format!(
            "invalid preset {}: expected 0-2",
            options.preset
        )));
    }
    if options.lossless && options.format == ImageFormat::Jpeg {
        return Err(CodecError::new(
            "lossless encoding is not supported for jpeg",
        ));
    }
    Ok(())
}

fn check_pixel_limit(width: u32, height: u32, max_pixels: u64) -> Result<(), CodecError> {
    let pixels = width as u64 * height as u64;
    if pixels > max_pixels {
        return Err(CodecError::new(format!(
            "memory limit exceeded: {}×{} needs {} pixels (max {})",
            width, height, pixels, max_pixels
        )));
    }
    Ok(())
}

fn to_rgba(image: RawImage, max_pixels: u64) -> Result<RgbaImage, CodecError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(CodecError::new(format!(
            "invalid dimensions {}×{}: width and height must be non-zero",
            width, height
        )));
    }
    check_pixel_limit(width, height, max_pixels)?;

    if !image.has_valid_len() {
        return Err(CodecError::new(format!(
            "pixel buffer length {} does not match {}×{} RGBA8 ({} bytes expected)",
            image.pixels().len(),
            width,
            height,
            image.expected_len().unwrap_or(usize::MAX)
        )));
    }

    let pixels = Vec::from(image.into_pixels());
    RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| CodecError::new("pixel buffer rejected by decoder"))
}

fn encode_png(rgba: &RgbaImage, preset: u8) -> Result<Vec<u8>, CodecError> {
    let compression = match preset {
        0 => CompressionType::Fast,
        1 => CompressionType::Default,
        _ => CompressionType::Best,
    };

    let mut out = Vec::new();
    PngEncoder::new_with_quality(&mut out, compression, PngFilter::Adaptive)
        .write_image(
            rgba.as_raw(),
            rgba.width(),
            rgba.height(),
            ExtendedColorType::Rgba8,
        )
        .map_err(map_image_error)?;
    Ok(out)
}

fn encode_jpeg(rgba: RgbaImage, quality: u8) -> Result<Vec<u8>, CodecError> {
    // JPEG has no alpha channel.
    let rgb = DynamicImage::ImageRgba8(rgba).into_rgb8();

    let mut out = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(
            rgb.as_raw(),
            rgb.width(),
            rgb.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(map_image_error)?;
    Ok(out)
}

fn map_image_error(err: ImageError) -> CodecError {
    match err {
        ImageError::Limits(e) => CodecError::new(format!("memory limit exceeded: {}", e)),
        other => CodecError::new(format!("encoding failed: {}", other)),
    }
}
