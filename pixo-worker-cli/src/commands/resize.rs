//! Resize command - resample an image file and re-encode it.
//!
//! Runs two tasks on the same executor: a resize, then a compress of the
//! resized pixels into the output format.

use std::path::PathBuf;

use tracing::info;

use pixo_worker::codec::{CompressOptions, RawImage, ResizeOptions};
use pixo_worker::protocol::TaskResult;

use super::common::{load_image, resolve_format, wait_for, write_output, AlgorithmArg, FormatArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the resize command.
pub struct ResizeArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub algorithm: AlgorithmArg,
    pub keep_aspect: bool,
    pub format: Option<FormatArg>,
    pub quality: Option<u8>,
    pub timeout: Option<u64>,
}

/// Run the resize command.
pub async fn run(runner: &CliRunner, args: ResizeArgs) -> Result<(), CliError> {
    runner.log_startup("resize");

    if args.width == 0 || args.height == 0 {
        return Err(CliError::InvalidArgument(
            "--width and --height must be greater than zero".to_string(),
        ));
    }

    let image = load_image(&args.input)?;
    let options = ResizeOptions::new(args.width, args.height)
        .with_algorithm(args.algorithm.into())
        .with_maintain_aspect_ratio(args.keep_aspect);
    info!(
        input = %args.input.display(),
        from_width = image.width(),
        from_height = image.height(),
        to_width = args.width,
        to_height = args.height,
        algorithm = %options.algorithm,
        "Resizing"
    );

    let (client, executor) = runner.spawn_client();
    let outcome = async {
        let resized = match wait_for(client.resize(image, options).await?, args.timeout).await? {
            TaskResult::Resize(result) => result,
            TaskResult::Compress(_) => {
                return Err(CliError::InvalidArgument(
                    "executor returned a compress result for a resize task".to_string(),
                ))
            }
        };

        let mut compress = CompressOptions {
            format: resolve_format(args.format, &args.output),
            ..CompressOptions::default()
        };
        if let Some(quality) = args.quality {
            compress.quality = quality;
        }

        let (width, height) = (resized.width, resized.height);
        let encoded = wait_for(
            client
                .compress(RawImage::new(width, height, resized.data), compress)
                .await?,
            args.timeout,
        )
        .await?;
        Ok::<_, CliError>((width, height, encoded))
    }
    .await;

    runner.shutdown();
    let _ = executor.await;

    let (width, height, encoded) = outcome?;
    write_output(&args.output, encoded.data())?;
    println!(
        "Wrote {} ({}×{}, {} bytes)",
        args.output.display(),
        width,
        height,
        encoded.data().len()
    );
    Ok(())
}
