//! CLI runner for common setup and operations.
//!
//! Encapsulates configuration loading, logging initialization and executor
//! startup so each command handler only deals with its own work.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pixo_worker::client::DispatchClient;
use pixo_worker::codec::ImageCodec;
use pixo_worker::config::ConfigFile;
use pixo_worker::executor::{spawn_executor, ExecutorLink, ExecutorStatsSnapshot};
use pixo_worker::logging::{init_logging, LoggingGuard};

use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
    shutdown: CancellationToken,
}

impl CliRunner {
    /// Load config (explicit path or the default location) and initialize logging.
    ///
    /// `log_file` overrides `[logging] file`.
    pub fn new(config_path: Option<&Path>, log_file: Option<PathBuf>) -> Result<Self, CliError> {
        let mut config = match config_path {
            Some(path) => ConfigFile::load_from(path)?,
            None => ConfigFile::load()?,
        };
        if log_file.is_some() {
            config.logging.file = log_file;
        }

        let logging_guard =
            init_logging(&config.logging).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
            shutdown: CancellationToken::new(),
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("pixo-worker v{}", pixo_worker::VERSION);
        info!(
            command,
            max_concurrent_tasks = self.config().executor.max_concurrent_tasks,
            max_pixels = self.config().codec.max_pixels,
            "pixo-worker CLI starting"
        );
    }

    /// Cancels the shutdown token on Ctrl-C.
    pub fn install_ctrlc_handler(&self) {
        let token = self.shutdown.clone();
        if let Err(e) = ctrlc::set_handler(move || token.cancel()) {
            warn!(error = %e, "Failed to install Ctrl-C handler");
        }
    }

    /// Starts an executor with the reference codec.
    pub fn spawn_executor(&self) -> (ExecutorLink, JoinHandle<ExecutorStatsSnapshot>) {
        let codec = Arc::new(ImageCodec::from_config(&self.config.codec));
        spawn_executor(self.config.executor.clone(), codec, self.shutdown.clone())
    }

    /// Starts an executor and wraps it in a dispatch client.
    pub fn spawn_client(&self) -> (DispatchClient, JoinHandle<ExecutorStatsSnapshot>) {
        let (link, handle) = self.spawn_executor();
        (DispatchClient::new(link), handle)
    }

    /// Signals the executor to stop.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}
