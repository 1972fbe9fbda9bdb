//! Settings structs, one per `[section]` of the INI file.

use std::path::PathBuf;
use std::time::Duration;

use crate::codec::DEFAULT_MAX_PIXELS;

/// Default request channel capacity.
pub const DEFAULT_REQUEST_CAPACITY: usize = 1000;

/// Default response channel capacity.
pub const DEFAULT_RESPONSE_CAPACITY: usize = 1000;

/// Default age after which an unobserved cancel is forgotten.
pub const DEFAULT_CANCELLATION_TTL: Duration = Duration::from_secs(300);

/// Default time in-flight tasks get to finish at shutdown.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Default log level when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Concurrency cap used when the core count is unavailable.
const FALLBACK_CONCURRENCY: usize = 4;

/// One codec call per core by default.
pub fn default_max_concurrent_tasks() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(FALLBACK_CONCURRENCY)
}

/// Task executor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    pub request_capacity: usize,
    pub response_capacity: usize,

    /// Codec calls allowed to run at once; further requests queue.
    pub max_concurrent_tasks: usize,

    /// `None` keeps unobserved cancels until the executor stops.
    pub cancellation_ttl: Option<Duration>,

    pub shutdown_grace: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            request_capacity: DEFAULT_REQUEST_CAPACITY,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
            max_concurrent_tasks: default_max_concurrent_tasks(),
            cancellation_ttl: Some(DEFAULT_CANCELLATION_TTL),
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl ExecutorConfig {
    pub fn with_request_capacity(mut self, capacity: usize) -> Self {
        self.request_capacity = capacity;
        self
    }

    pub fn with_response_capacity(mut self, capacity: usize) -> Self {
        self.response_capacity = capacity;
        self
    }

    pub fn with_max_concurrent_tasks(mut self, max: usize) -> Self {
        self.max_concurrent_tasks = max;
        self
    }

    pub fn with_cancellation_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.cancellation_ttl = ttl;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// Reference codec configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecConfig {
    /// Largest source or output image accepted, in pixels.
    pub max_pixels: u64,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            max_pixels: DEFAULT_MAX_PIXELS,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Also write logs to this file.
    pub file: Option<PathBuf>,

    /// Filter used when `RUST_LOG` is unset.
    pub level: Option<String>,
}

impl LoggingConfig {
    /// The configured level, or [`DEFAULT_LOG_LEVEL`].
    pub fn level_or_default(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }
}

/// Complete configuration loaded from `config.ini`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigFile {
    pub executor: ExecutorConfig,
    pub codec: CodecConfig,
    pub logging: LoggingConfig,
}
