//! Configuration management for Catalog Fetcher
//!
//! [`FetcherConfig`] is the immutable parameter set shared by discovery and
//! the worker pool. It is built in memory (defaults, builder or TOML), then
//! validated locally before any network or ledger resource is acquired.
//! [`AppConfig`] is the on-disk file layout that wraps it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::constants::{files, http, limits, logging, workers};
use crate::errors::{ConfigError, ConfigResult};

/// Hint for the async runtime the binary should build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "flavor")]
pub enum RuntimeHint {
    /// Work-stealing scheduler; `None` lets tokio pick one thread per core
    #[default]
    MultiThread,
    /// Work-stealing scheduler with an explicit worker count
    MultiThreadWith { worker_threads: usize },
    /// Everything on the calling thread
    CurrentThread,
}

/// Engine parameters
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FetcherConfig {
    /// Width of the fetch worker pool
    pub max_concurrent_downloads: usize,
    /// Minimum spacing between requests to one host
    #[serde(with = "humantime_serde")]
    pub request_delay: Duration,
    /// Per-request deadline
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Connection establishment deadline
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Retries for transient failures within one download
    pub max_retries: u32,
    /// First retry delay
    #[serde(with = "humantime_serde")]
    pub retry_base_delay: Duration,
    /// Retry delay cap
    #[serde(with = "humantime_serde")]
    pub retry_max_delay: Duration,
    /// Hard ceiling for a single file, in bytes
    pub max_file_size: u64,
    /// Idle transport connections kept per host
    pub connection_pool_size: usize,
    /// TCP keep-alive and pool idle timeout
    #[serde(with = "humantime_serde")]
    pub keepalive_timeout: Duration,
    /// Streaming write granularity, in bytes
    pub chunk_size: usize,
    /// Library root; files land in `<download_dir>/<source>/`
    pub download_dir: PathBuf,
    /// Ledger database file
    pub db_path: PathBuf,
    /// User agent sent with every request
    pub user_agent: String,
    /// Runtime flavor for the binary
    pub runtime: RuntimeHint,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: workers::DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            request_delay: limits::DEFAULT_REQUEST_DELAY,
            timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            max_retries: limits::MAX_RETRIES,
            retry_base_delay: limits::RETRY_BASE_DELAY,
            retry_max_delay: limits::RETRY_MAX_DELAY,
            max_file_size: files::DEFAULT_MAX_FILE_SIZE,
            connection_pool_size: http::DEFAULT_CONNECTION_POOL_SIZE,
            keepalive_timeout: http::DEFAULT_KEEPALIVE_TIMEOUT,
            chunk_size: files::DEFAULT_CHUNK_SIZE,
            download_dir: PathBuf::from(files::DEFAULT_DOWNLOAD_DIR),
            db_path: PathBuf::from(files::DEFAULT_DB_PATH),
            user_agent: http::USER_AGENT.to_string(),
            runtime: RuntimeHint::default(),
        }
    }
}

impl FetcherConfig {
    /// Start a builder seeded with defaults
    pub fn builder() -> FetcherConfigBuilder {
        FetcherConfigBuilder::new()
    }

    /// Validate configuration values, collecting every problem found
    ///
    /// Each problem is a [`ConfigError::InvalidValue`] naming the field, the
    /// offending value and the reason.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();
        let mut invalid = |field: &str, value: String, reason: &str| {
            errors.push(ConfigError::InvalidValue {
                field: field.to_string(),
                value,
                reason: reason.to_string(),
            });
        };

        if self.max_concurrent_downloads == 0 {
            invalid("max_concurrent_downloads", "0".to_string(), "must be at least 1");
        }
        if self.max_concurrent_downloads > workers::MAX_CONCURRENT_DOWNLOADS {
            invalid(
                "max_concurrent_downloads",
                self.max_concurrent_downloads.to_string(),
                &format!("must not exceed {}", workers::MAX_CONCURRENT_DOWNLOADS),
            );
        }
        if self.timeout.is_zero() {
            invalid("timeout", "0s".to_string(), "must be greater than zero");
        }
        if self.connect_timeout.is_zero() {
            invalid("connect_timeout", "0s".to_string(), "must be greater than zero");
        }
        if self.retry_base_delay > self.retry_max_delay {
            invalid(
                "retry_base_delay",
                format!("{:?}", self.retry_base_delay),
                &format!("must not exceed retry_max_delay ({:?})", self.retry_max_delay),
            );
        }
        if self.max_file_size == 0 {
            invalid("max_file_size", "0".to_string(), "must be greater than zero");
        }
        if self.connection_pool_size == 0 {
            invalid("connection_pool_size", "0".to_string(), "must be at least 1");
        }
        if self.chunk_size == 0 {
            invalid("chunk_size", "0".to_string(), "must be greater than zero");
        }
        if self.download_dir.as_os_str().is_empty() {
            invalid("download_dir", String::new(), "must not be empty");
        }
        if self.db_path.as_os_str().is_empty() {
            invalid("db_path", String::new(), "must not be empty");
        }
        if self.user_agent.trim().is_empty() {
            invalid("user_agent", self.user_agent.clone(), "must not be blank");
        }
        if let RuntimeHint::MultiThreadWith { worker_threads: 0 } = self.runtime {
            invalid("runtime.worker_threads", "0".to_string(), "must be at least 1");
        }

        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(ConfigError::ValidationFailed { errors }),
        }
    }
}

/// Builder for [`FetcherConfig`]; `build` validates
#[derive(Debug, Default)]
pub struct FetcherConfigBuilder {
    config: FetcherConfig,
}

impl FetcherConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration (e.g. one read from TOML)
    pub fn from_config(config: FetcherConfig) -> Self {
        Self { config }
    }

    pub fn max_concurrent_downloads(mut self, count: usize) -> Self {
        self.config.max_concurrent_downloads = count;
        self
    }

    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.config.request_delay = delay;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.config.max_retries = retries;
        self
    }

    /// Set both backoff bounds
    pub fn retry_delays(mut self, base: Duration, max: Duration) -> Self {
        self.config.retry_base_delay = base;
        self.config.retry_max_delay = max;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn connection_pool_size(mut self, size: usize) -> Self {
        self.config.connection_pool_size = size;
        self
    }

    pub fn keepalive_timeout(mut self, timeout: Duration) -> Self {
        self.config.keepalive_timeout = timeout;
        self
    }

    pub fn chunk_size(mut self, bytes: usize) -> Self {
        self.config.chunk_size = bytes;
        self
    }

    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.download_dir = dir.into();
        self
    }

    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.db_path = path.into();
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    pub fn runtime(mut self, hint: RuntimeHint) -> Self {
        self.config.runtime = hint;
        self
    }

    /// Validate and return the finished configuration
    pub fn build(self) -> ConfigResult<FetcherConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level for the application
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: logging::DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Configuration file layout
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Engine settings
    pub fetcher: FetcherConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration with precedence:
    /// 1. Default values
    /// 2. Config file (explicit override, else the first standard location found)
    ///
    /// CLI overrides are applied afterwards through [`FetcherConfigBuilder`].
    pub fn load(config_file_override: Option<&Path>) -> ConfigResult<Self> {
        let config_path = match config_file_override {
            Some(path) if !path.exists() => {
                return Err(ConfigError::NotFound {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Some(path.to_path_buf()),
            None => Self::find_config_file(),
        };

        match config_path {
            Some(path) => Self::load_from_file(&path),
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from("./catalog-fetcher.toml")];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Default per-user config file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("catalog_fetcher").join("config.toml"))
    }

    fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}
