//! Configuration types for pixo-worker components.
//!
//! Component configs ([`ExecutorConfig`], [`CodecConfig`], [`LoggingConfig`])
//! are plain structs with defaults and `with_*` setters. [`ConfigFile`] groups
//! them and loads overrides from `~/.pixo-worker/config.ini`:
//!
//! ```ini
//! [executor]
//! request_capacity = 1000
//! response_capacity = 1000
//! max_concurrent_tasks = 4
//! cancellation_ttl_secs = 300
//! shutdown_grace_secs = 5
//!
//! [codec]
//! max_pixels = 100000000
//!
//! [logging]
//! file = ~/.pixo-worker/pixo-worker.log
//! level = info
//! ```
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use pixo_worker::config::ExecutorConfig;
//!
//! let config = ExecutorConfig::default()
//!     .with_max_concurrent_tasks(2)
//!     .with_shutdown_grace(Duration::from_secs(1));
//! assert_eq!(config.max_concurrent_tasks, 2);
//! ```

mod file;
mod parser;
mod settings;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    default_max_concurrent_tasks, CodecConfig, ConfigFile, ExecutorConfig, LoggingConfig,
    DEFAULT_CANCELLATION_TTL, DEFAULT_LOG_LEVEL, DEFAULT_REQUEST_CAPACITY,
    DEFAULT_RESPONSE_CAPACITY, DEFAULT_SHUTDOWN_GRACE,
};
