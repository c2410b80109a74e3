//! Application constants for Catalog Fetcher
//!
//! This module centralizes all constants used throughout the application,
//! organized by functional domain for maintainability and clarity.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// Default user agent for all HTTP requests
    pub const USER_AGENT: &str = concat!(
        "Catalog-Fetcher/",
        env!("CARGO_PKG_VERSION"),
        " (Library Acquisition Tool)"
    );

    /// Default per-request deadline
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Idle connections kept per host in the transport pool
    pub const DEFAULT_CONNECTION_POOL_SIZE: usize = 10;

    /// TCP keep-alive and pool idle timeout
    pub const DEFAULT_KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(30);

    /// Maximum number of redirects to follow
    pub const MAX_REDIRECTS: usize = 10;
}

/// Rate limiting and retry configuration
pub mod limits {
    use super::Duration;

    /// Minimum spacing between two requests to the same host
    pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_millis(500);

    /// Maximum retry attempts for transient failures
    pub const MAX_RETRIES: u32 = 3;

    /// First backoff interval
    pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

    /// Backoff cap
    pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(60);

    /// Backoff growth factor between attempts
    pub const RETRY_MULTIPLIER: f64 = 2.0;
}

/// Worker and concurrency configuration
pub mod workers {
    /// Default width of the fetch worker pool
    pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: usize = 5;

    /// Upper bound accepted by configuration validation
    pub const MAX_CONCURRENT_DOWNLOADS: usize = 256;

    /// Number of pending jobs pulled from the ledger per batch
    pub const DEFAULT_BATCH_SIZE: usize = 100;
}

/// File operation constants
pub mod files {
    /// Temporary file suffix for atomic writes
    pub const TEMP_FILE_SUFFIX: &str = ".part";

    /// Default ceiling for a single download (500MB)
    pub const DEFAULT_MAX_FILE_SIZE: u64 = 500 * 1024 * 1024;

    /// Streaming write granularity (8KB)
    pub const DEFAULT_CHUNK_SIZE: usize = 8 * 1024;

    /// Default library root
    pub const DEFAULT_DOWNLOAD_DIR: &str = "downloads";

    /// Default ledger location
    pub const DEFAULT_DB_PATH: &str = "downloads.db";

    /// File name used when a URL has no usable last path segment
    pub const FALLBACK_FILE_NAME: &str = "index";
}

/// Ledger storage settings
pub mod ledger {
    use super::Duration;

    /// Pooled SQLite connections
    pub const MAX_CONNECTIONS: u32 = 8;

    /// How long a writer waits on a locked database
    pub const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
}

/// Catalog endpoints and templates
pub mod catalogs {
    /// Project Gutenberg site root
    pub const GUTENBERG_BASE_URL: &str = "https://www.gutenberg.org";

    /// Gutenberg listing used when no category is given
    pub const GUTENBERG_DEFAULT_LISTING: &str =
        "https://www.gutenberg.org/ebooks/search/?sort_order=downloads";

    /// Listing pages followed per discovery run
    pub const GUTENBERG_MAX_PAGES: usize = 10;

    /// arXiv site root
    pub const ARXIV_BASE_URL: &str = "https://arxiv.org";

    /// arXiv category used when none is given
    pub const ARXIV_DEFAULT_CATEGORY: &str = "cs.DL";
}

/// Web scraping CSS selectors
pub mod selectors {
    /// Gutenberg book links on listing pages
    pub const GUTENBERG_BOOK_LINK: &str = "a[href^='/ebooks/']";

    /// Gutenberg book title inside a listing entry
    pub const GUTENBERG_BOOK_TITLE: &str = "span.title";

    /// Gutenberg pagination link
    pub const GUTENBERG_NEXT_PAGE: &str = "a[title^='Go to the next page']";

    /// arXiv abstract links on listing pages
    pub const ARXIV_ABS_LINK: &str = "a[href^='/abs/']";
}

/// Logging and debugging constants
pub mod logging {
    /// Default log level
    pub const DEFAULT_LOG_LEVEL: &str = "info";
}

// Re-export commonly used constants for convenience
pub use files::{DEFAULT_CHUNK_SIZE, DEFAULT_MAX_FILE_SIZE, TEMP_FILE_SUFFIX};
pub use http::{DEFAULT_TIMEOUT as HTTP_TIMEOUT, USER_AGENT};
pub use limits::{DEFAULT_REQUEST_DELAY, MAX_RETRIES};
pub use workers::DEFAULT_MAX_CONCURRENT_DOWNLOADS;
