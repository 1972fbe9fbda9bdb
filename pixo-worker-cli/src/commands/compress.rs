//! Compress command - encode an image file through the executor.

use std::path::PathBuf;

use tracing::info;

use pixo_worker::codec::{CompressOptions, DEFAULT_PRESET, DEFAULT_QUALITY};
use pixo_worker::protocol::TaskResult;

use super::common::{load_image, resolve_format, wait_for, write_output, FormatArg};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the compress command.
pub struct CompressArgs {
    pub input: PathBuf,
    pub output: PathBuf,
    pub format: Option<FormatArg>,
    pub quality: Option<u8>,
    pub preset: Option<u8>,
    pub lossless: bool,
    pub timeout: Option<u64>,
}

/// Run the compress command.
pub async fn run(runner: &CliRunner, args: CompressArgs) -> Result<(), CliError> {
    runner.log_startup("compress");

    let image = load_image(&args.input)?;
    let options = CompressOptions {
        format: resolve_format(args.format, &args.output),
        quality: args.quality.unwrap_or(DEFAULT_QUALITY),
        preset: args.preset.unwrap_or(DEFAULT_PRESET),
        lossless: args.lossless,
    };
    info!(
        input = %args.input.display(),
        width = image.width(),
        height = image.height(),
        format = %options.format,
        "Compressing"
    );

    let (client, executor) = runner.spawn_client();
    let pending = client.compress(image, options).await?;
    let outcome = wait_for(pending, args.timeout).await;

    runner.shutdown();
    let _ = executor.await;

    let result = match outcome? {
        TaskResult::Compress(result) => result,
        TaskResult::Resize(_) => {
            return Err(CliError::InvalidArgument(
                "executor returned a resize result for a compress task".to_string(),
            ))
        }
    };

    write_output(&args.output, &result.data)?;
    println!(
        "Wrote {} ({} bytes, {:.1} ms)",
        args.output.display(),
        result.data.len(),
        result.elapsed_ms
    );
    Ok(())
}
