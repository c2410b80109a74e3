//! Prelude module for Catalog Fetcher Library
//!
//! Re-exports the items needed for typical embedding with a single
//! `use catalog_fetcher::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use catalog_fetcher::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Arc::new(FetcherConfig::builder().max_concurrent_downloads(4).build()?);
//!     let ledger = Ledger::open(&config.db_path).await?;
//!     let pool = WorkerPool::new(config, ledger)?;
//!     pool.drain_pending(100).await?;
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

// Engine components
pub use crate::app::{
    discoverer_for, BatchSummary, Discoverer, DiscoveryReport, DownloadStats, FetchClient,
    JobOutcome, JobStatus, Ledger, PendingJob, WorkerPool,
};

// Configuration
pub use crate::config::{FetcherConfig, FetcherConfigBuilder, RuntimeHint};
