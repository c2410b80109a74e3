//! Command-line argument parsing for Catalog Fetcher
//!
//! Global options select the configuration file and override individual
//! engine settings; subcommands pick the part of the pipeline to run.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::FetcherConfigBuilder;
use crate::constants::workers;

/// Catalog Fetcher - build a local library from public catalogs
#[derive(Parser, Debug)]
#[command(
    name = "catalog_fetcher",
    version,
    about = "Discover and download items from public catalogs into a local library",
    long_about = "Discovers items on catalog listing pages (Project Gutenberg, arXiv), records them in a
resumable SQLite ledger and downloads them with bounded concurrency and per-host rate limiting."
)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all subcommands
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Very verbose logging (debug level)
    #[arg(long, global = true)]
    pub very_verbose: bool,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file path
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Library root directory
    #[arg(long, global = true, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Ledger database path
    #[arg(long, global = true, value_name = "FILE")]
    pub db_path: Option<PathBuf>,

    /// Number of concurrent downloads
    #[arg(short = 'j', long, global = true, value_name = "N")]
    pub concurrency: Option<usize>,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Discover new items, download everything pending, print statistics
    Fetch(FetchArgs),

    /// Register items from a catalog listing without downloading
    Discover(DiscoverArgs),

    /// Download pending jobs only (resumes an interrupted run)
    Download(DownloadArgs),

    /// Show ledger statistics
    Stats,
}

/// Catalog selection shared by `fetch` and `discover`
#[derive(Args, Debug, Clone)]
pub struct DiscoverArgs {
    /// Catalog to crawl (gutenberg, arxiv)
    #[arg(short, long, default_value = "gutenberg")]
    pub source: String,

    /// Bookshelf number or search term (gutenberg), subject class (arxiv)
    #[arg(short, long)]
    pub category: Option<String>,

    /// Maximum number of items to register
    #[arg(short, long, default_value = "100")]
    pub limit: usize,
}

/// Arguments for the download command
#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Pending jobs pulled from the ledger per batch
    #[arg(short, long, default_value_t = workers::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,
}

/// Arguments for the fetch command
#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub discover: DiscoverArgs,

    #[command(flatten)]
    pub download: DownloadArgs,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Logging level requested on the command line, if any
    pub fn log_level(&self) -> Option<tracing::Level> {
        if self.global.quiet {
            Some(tracing::Level::ERROR)
        } else if self.global.very_verbose {
            Some(tracing::Level::DEBUG)
        } else if self.global.verbose {
            Some(tracing::Level::INFO)
        } else {
            None
        }
    }
}

impl GlobalArgs {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply(&self, mut builder: FetcherConfigBuilder) -> FetcherConfigBuilder {
        if let Some(dir) = &self.download_dir {
            builder = builder.download_dir(dir.clone());
        }
        if let Some(path) = &self.db_path {
            builder = builder.db_path(path.clone());
        }
        if let Some(count) = self.concurrency {
            builder = builder.max_concurrent_downloads(count);
        }
        builder
    }
}

impl DownloadArgs {
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be greater than 0".to_string());
        }
        Ok(())
    }
}
