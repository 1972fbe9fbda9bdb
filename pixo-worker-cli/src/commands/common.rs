//! Common types and utilities shared across CLI commands.

use std::path::Path;
use std::time::Duration;

use clap::ValueEnum;
use pixo_worker::client::PendingTask;
use pixo_worker::codec::{ImageFormat, RawImage, ResizeAlgorithm};
use pixo_worker::protocol::TaskResult;

use crate::error::CliError;

/// Output format selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum FormatArg {
    /// Lossless PNG
    Png,
    /// Lossy JPEG (no alpha)
    Jpeg,
}

impl From<FormatArg> for ImageFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Png => ImageFormat::Png,
            FormatArg::Jpeg => ImageFormat::Jpeg,
        }
    }
}

/// Resampling filter selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum AlgorithmArg {
    /// Nearest neighbour (fastest, blocky)
    Nearest,
    /// Bilinear (balanced)
    Bilinear,
    /// Lanczos3 (sharpest, slowest)
    Lanczos3,
}

impl From<AlgorithmArg> for ResizeAlgorithm {
    fn from(algorithm: AlgorithmArg) -> Self {
        match algorithm {
            AlgorithmArg::Nearest => ResizeAlgorithm::Nearest,
            AlgorithmArg::Bilinear => ResizeAlgorithm::Bilinear,
            AlgorithmArg::Lanczos3 => ResizeAlgorithm::Lanczos3,
        }
    }
}

/// Resolve output format: CLI flag, then output extension, then PNG.
pub fn resolve_format(cli_format: Option<FormatArg>, output: &Path) -> ImageFormat {
    cli_format
        .map(ImageFormat::from)
        .or_else(|| {
            output
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(ImageFormat::from_extension)
        })
        .unwrap_or_default()
}

/// Decode an image file into RGBA8 pixels.
pub fn load_image(path: &Path) -> Result<RawImage, CliError> {
    let decoded = image::open(path).map_err(|error| CliError::ImageRead {
        path: path.display().to_string(),
        error,
    })?;
    let rgba = decoded.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(RawImage::new(width, height, rgba.into_raw()))
}

/// Write bytes to the output path.
pub fn write_output(path: &Path, data: &[u8]) -> Result<(), CliError> {
    std::fs::write(path, data).map_err(|error| CliError::FileWrite {
        path: path.display().to_string(),
        error,
    })
}

/// Wait for a task, with an optional timeout in seconds.
pub async fn wait_for(pending: PendingTask, timeout: Option<u64>) -> Result<TaskResult, CliError> {
    let result = match timeout {
        Some(secs) => pending.wait_timeout(Duration::from_secs(secs)).await?,
        None => pending.wait().await?,
    };
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_resolve_format_prefers_flag() {
        let format = resolve_format(Some(FormatArg::Png), &PathBuf::from("out.jpg"));
        assert_eq!(format, ImageFormat::Png);
    }

    #[test]
    fn test_resolve_format_from_extension() {
        assert_eq!(
            resolve_format(None, &PathBuf::from("out.JPEG")),
            ImageFormat::Jpeg
        );
        assert_eq!(resolve_format(None, &PathBuf::from("out")), ImageFormat::Png);
    }

    #[test]
    fn test_load_image_round_trip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("in.png");
        let source = image::RgbaImage::from_pixel(3, 2, image::Rgba([10, 20, 30, 255]));
        source.save(&path).unwrap();

        let raw = load_image(&path).unwrap();
        assert_eq!((raw.width(), raw.height()), (3, 2));
        assert!(raw.has_valid_len());
        assert_eq!(&raw.pixels()[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_load_missing_image() {
        let err = load_image(Path::new("/nonexistent/in.png")).unwrap_err();
        assert!(matches!(err, CliError::ImageRead { .. }));
    }
}
