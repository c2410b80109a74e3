//! Fetch worker pool
//!
//! Drains pending jobs from the ledger with bounded concurrency, streaming
//! each body to `<download_dir>/<source>/<basename>` and recording the
//! terminal outcome.
//!
//! - [`types`] - per-job outcomes and batch summaries
//! - [`fetch`] - a single streamed download attempt
//! - [`pool`] - scheduling, cancellation and ledger bookkeeping
//!
//! # Basic Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_fetcher::app::ledger::Ledger;
//! use catalog_fetcher::app::worker::WorkerPool;
//! use catalog_fetcher::config::FetcherConfig;
//!
//! # async fn example() -> catalog_fetcher::Result<()> {
//! let ledger = Ledger::open("downloads.db".as_ref()).await?;
//! let pool = WorkerPool::new(Arc::new(FetcherConfig::default()), ledger)?;
//! let summary = pool.drain_pending(100).await?;
//! println!("{} downloaded, {} failed", summary.successful, summary.failed);
//! # Ok(())
//! # }
//! ```

pub mod fetch;
pub mod pool;
pub mod types;


pub use pool::WorkerPool;
pub use types::{BatchSummary, JobOutcome, SkipReason};
