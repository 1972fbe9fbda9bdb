//! pixo-worker CLI - Command-line interface
//!
//! This binary provides a command-line interface to the pixo-worker library.

mod commands;
mod error;
mod runner;

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use commands::common::{AlgorithmArg, FormatArg};
use commands::compress::CompressArgs;
use commands::resize::ResizeArgs;
use error::CliError;
use runner::CliRunner;

/// Time left to blocking stdin readers once a command returns.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "pixo-worker")]
#[command(version, about = "Compress and resize images on a background executor", long_about = None)]
struct Cli {
    /// Config file (default: ~/.pixo-worker/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON-lines worker: requests on stdin, responses on stdout
    Serve,

    /// Encode an image file as PNG or JPEG
    Compress {
        /// Input image (PNG or JPEG)
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (auto-detected from file extension if not specified)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// JPEG quality, 1-100
        #[arg(long)]
        quality: Option<u8>,

        /// PNG compression preset: 0 fast, 1 balanced, 2 smallest
        #[arg(long)]
        preset: Option<u8>,

        /// Request lossless output (PNG only)
        #[arg(long)]
        lossless: bool,

        /// Give up after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Resample an image file and re-encode it
    Resize {
        /// Input image (PNG or JPEG)
        input: PathBuf,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Target width in pixels
        #[arg(long)]
        width: u32,

        /// Target height in pixels
        #[arg(long)]
        height: u32,

        /// Resampling filter
        #[arg(long, value_enum, default_value = "bilinear")]
        algorithm: AlgorithmArg,

        /// Fit inside width×height, keeping the source aspect ratio
        #[arg(long)]
        keep_aspect: bool,

        /// Output format (auto-detected from file extension if not specified)
        #[arg(long, value_enum)]
        format: Option<FormatArg>,

        /// JPEG quality, 1-100
        #[arg(long)]
        quality: Option<u8>,

        /// Give up after this many seconds (per task)
        #[arg(long)]
        timeout: Option<u64>,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(cli.config.as_deref(), cli.log_file)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    let result = runtime.block_on(async {
        match cli.command {
            Commands::Serve => commands::serve::run(&runner).await,
            Commands::Compress {
                input,
                output,
                format,
                quality,
                preset,
                lossless,
                timeout,
            } => {
                let args = CompressArgs {
                    input,
                    output,
                    format,
                    quality,
                    preset,
                    lossless,
                    timeout,
                };
                commands::compress::run(&runner, args).await
            }
            Commands::Resize {
                input,
                output,
                width,
                height,
                algorithm,
                keep_aspect,
                format,
                quality,
                timeout,
            } => {
                let args = ResizeArgs {
                    input,
                    output,
                    width,
                    height,
                    algorithm,
                    keep_aspect,
                    format,
                    quality,
                    timeout,
                };
                commands::resize::run(&runner, args).await
            }
        }
    });

    // stdin is read on a blocking thread that may never return.
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_resize() {
        let cli = Cli::try_parse_from([
            "pixo-worker",
            "resize",
            "in.png",
            "-o",
            "out.jpg",
            "--width",
            "50",
            "--height",
            "40",
            "--algorithm",
            "lanczos3",
            "--keep-aspect",
        ])
        .unwrap();

        match cli.command {
            Commands::Resize {
                width,
                height,
                algorithm,
                keep_aspect,
                ..
            } => {
                assert_eq!((width, height), (50, 40));
                assert_eq!(algorithm, AlgorithmArg::Lanczos3);
                assert!(keep_aspect);
            }
            _ => panic!("expected resize"),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["pixo-worker", "serve", "--config", "/tmp/p.ini"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/p.ini")));
        assert!(matches!(cli.command, Commands::Serve));
    }
}
