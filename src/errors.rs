//! Error types for Catalog Fetcher
//!
//! Errors are split by component. Per-job download problems never leave the
//! worker pool as errors (they become ledger rows); only infrastructure
//! failures such as an unreachable ledger propagate to callers.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Job ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Underlying SQLite failure
    #[error("Ledger database error")]
    Database(#[from] sqlx::Error),

    /// Ledger directory could not be prepared
    #[error("Cannot prepare ledger location {path}")]
    Location {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Attempt to write a non-terminal status
    #[error("Invalid target status '{status}': only terminal statuses can be recorded")]
    InvalidStatus { status: String },

    /// Status column holds an unknown value
    #[error("Unknown job status in ledger: {value}")]
    UnknownStatus { value: String },
}

/// Download and HTTP client errors
///
/// These describe a single fetch attempt. The worker pool classifies them
/// into retries and terminal ledger states.
#[derive(Error, Debug)]
pub enum DownloadError {
    /// HTTP request error (connect, timeout, body)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error during file operations
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid URL provided
    #[error("Invalid URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },

    /// Server returned error status
    #[error("Server error: HTTP {status}")]
    ServerError { status: u16 },

    /// Rate limit exceeded; `retry_after` is the server's requested pause
    #[error("Rate limit exceeded. Server responded with HTTP 429")]
    RateLimitExceeded { retry_after: Option<Duration> },

    /// No response headers, or no body data, within the deadline
    #[error("Timed out after {after:?} waiting for {stage}")]
    Timeout { stage: &'static str, after: Duration },

    /// Another job already produced a file at this path
    #[error("Destination already exists: {}", path.display())]
    DestinationExists { path: PathBuf },

    /// Maximum retries exceeded
    #[error("Maximum retry attempts ({max_retries}) exceeded: {last_error}")]
    MaxRetriesExceeded { max_retries: u32, last_error: String },
}

impl DownloadError {
    /// Whether another attempt could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            DownloadError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            DownloadError::ServerError { status } => *status >= 500,
            DownloadError::RateLimitExceeded { .. } | DownloadError::Timeout { .. } => true,
            DownloadError::Io(_)
            | DownloadError::InvalidUrl { .. }
            | DownloadError::DestinationExists { .. }
            | DownloadError::MaxRetriesExceeded { .. } => false,
        }
    }

    /// Pause the server asked for before the next attempt, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DownloadError::RateLimitExceeded { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Catalog discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// Listing page could not be fetched
    #[error("Failed to fetch listing {url}")]
    Fetch {
        url: String,
        #[source]
        source: DownloadError,
    },

    /// CSS selector error
    #[error("Invalid CSS selector: {selector}")]
    InvalidSelector { selector: String },

    /// Invalid URL discovered or configured
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    /// Registration failed in the ledger
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Unknown catalog name
    #[error("Unknown source '{name}'. Known sources: {known}")]
    UnknownSource { name: String, known: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Cannot read configuration file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Invalid configuration format
    #[error("Invalid configuration format")]
    InvalidFormat(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Several values failed validation
    #[error("Configuration validation failed: {}", join_errors(errors))]
    ValidationFailed { errors: Vec<ConfigError> },
}

fn join_errors(errors: &[ConfigError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Ledger error
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Download error
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Discovery error
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Download(e) => e.is_transient(),
            AppError::Discovery(DiscoveryError::Fetch { source, .. }) => source.is_transient(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Ledger(_) => "ledger",
            AppError::Download(_) => "download",
            AppError::Discovery(_) => "discovery",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Ledger result type alias
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Download result type alias
pub type DownloadResult<T> = std::result::Result<T, DownloadError>;

/// Discovery result type alias
pub type DiscoveryResult<T> = std::result::Result<T, DiscoveryError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
