//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use pixo_worker::client::DispatchError;
use pixo_worker::config::ConfigFileError;
use pixo_worker::protocol::ErrorType;
use pixo_worker::transport::TransportError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(ConfigFileError),
    /// Failed to start the async runtime
    Runtime(std::io::Error),
    /// Invalid command-line argument
    InvalidArgument(String),
    /// Failed to read or decode an input image
    ImageRead {
        path: String,
        error: image::ImageError,
    },
    /// Failed to write output file
    FileWrite { path: String, error: std::io::Error },
    /// A dispatched task failed
    Task(DispatchError),
    /// JSON-lines session failed
    Serve(TransportError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Task(e) => match e.error_type() {
                Some(ErrorType::WasmInit) => {
                    eprintln!();
                    eprintln!("The codec could not be initialized. Restart the worker and retry;");
                    eprintln!("if it keeps failing, reinstall pixo-worker.");
                }
                Some(ErrorType::OutOfMemory) => {
                    eprintln!();
                    eprintln!("The image is too large for the configured limits. Try:");
                    eprintln!("  1. Resizing the image first: pixo-worker resize ...");
                    eprintln!("  2. Raising max_pixels in the [codec] section of config.ini");
                }
                _ => {}
            },
            CliError::Config(_) => {
                eprintln!();
                eprintln!(
                    "Check {} or pass --config <path>",
                    pixo_worker::config::config_file_path().display()
                );
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start runtime: {}", e),
            CliError::InvalidArgument(msg) => write!(f, "{}", msg),
            CliError::ImageRead { path, error } => {
                write!(f, "Failed to read image '{}': {}", path, error)
            }
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
            CliError::Task(e) => match e.error_type() {
                Some(tag) => write!(f, "Task failed ({}): {}", tag, e),
                None => write!(f, "Task failed: {}", e),
            },
            CliError::Serve(e) => write!(f, "Worker session failed: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Config(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::ImageRead { error, .. } => Some(error),
            CliError::FileWrite { error, .. } => Some(error),
            CliError::Task(e) => Some(e),
            CliError::Serve(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e)
    }
}

impl From<DispatchError> for CliError {
    fn from(e: DispatchError) -> Self {
        CliError::Task(e)
    }
}

impl From<TransportError> for CliError {
    fn from(e: TransportError) -> Self {
        CliError::Serve(e)
    }
}
