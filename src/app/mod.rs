//! Core engine for Catalog Fetcher
//!
//! - [`ledger`]: durable job store keyed by URL
//! - [`client`]: shared HTTP fetcher with throttling and retries
//! - [`worker`]: bounded-concurrency download pool
//! - [`discovery`]: catalog crawlers that register jobs
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_fetcher::app::{discoverer_for, FetchClient, Ledger, WorkerPool};
//! use catalog_fetcher::config::FetcherConfig;
//!
//! # async fn example() -> catalog_fetcher::Result<()> {
//! let config = Arc::new(FetcherConfig::default());
//! let ledger = Ledger::open(&config.db_path).await?;
//! let client = FetchClient::new(Arc::clone(&config))?;
//!
//! let discoverer = discoverer_for("gutenberg", client.clone(), None)?;
//! discoverer.discover_content(&ledger, 50).await?;
//!
//! let pool = WorkerPool::with_client(config, ledger.clone(), client);
//! let summary = pool.drain_pending(25).await?;
//! println!("{} downloaded", summary.successful);
//! println!("{}", ledger.get_download_stats().await?);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod discovery;
pub mod ledger;
pub mod worker;

// Re-export main public API
pub use client::{parse_url, FetchClient};
pub use discovery::{
    discoverer_for, ArxivDiscoverer, Discoverer, DiscoveryReport, GutenbergDiscoverer,
};
pub use ledger::{DownloadJob, DownloadStats, JobId, JobStatus, Ledger, PendingJob};
pub use worker::{BatchSummary, JobOutcome, SkipReason, WorkerPool};
