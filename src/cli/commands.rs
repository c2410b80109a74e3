//! Command handlers for Catalog Fetcher CLI
//!
//! Each handler opens the ledger named by the configuration, wires the
//! engine components together and prints a summary. Components are created
//! here, once per invocation, and passed explicitly.

use std::sync::Arc;
use std::time::Instant;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::app::client::FetchClient;
use crate::app::discovery::{discoverer_for, DiscoveryReport};
use crate::app::ledger::{DownloadStats, Ledger};
use crate::app::worker::{BatchSummary, WorkerPool};
use crate::cli::{cancel_on_signal, DiscoverArgs, DownloadArgs, FetchArgs};
use crate::config::FetcherConfig;
use crate::errors::{AppError, Result};

/// Discover, then download everything pending
pub async fn handle_fetch(config: Arc<FetcherConfig>, args: FetchArgs) -> Result<()> {
    let start_time = Instant::now();
    args.download.validate().map_err(AppError::generic)?;

    let ledger = Ledger::open(&config.db_path).await?;
    let client = FetchClient::new(Arc::clone(&config))?;
    let pool = WorkerPool::with_client(config, ledger.clone(), client.clone());
    let token = pool.cancellation_token();
    let signals = cancel_on_signal(token.clone());

    let discovered = discover(client, &ledger, &args.discover, &token).await;
    let downloaded = match discovered {
        Ok(Some(_)) => pool.drain_pending(args.download.batch_size).await,
        Ok(None) => Ok(BatchSummary::default()),
        Err(e) => {
            signals.abort();
            ledger.close().await;
            return Err(e);
        }
    };
    signals.abort();

    let summary = downloaded?;
    print_summary(&summary);
    print_stats(&ledger.get_download_stats().await?);
    println!("  Total time: {:?}", start_time.elapsed());
    ledger.close().await;
    Ok(())
}

/// Register candidates only
pub async fn handle_discover(config: Arc<FetcherConfig>, args: DiscoverArgs) -> Result<()> {
    let ledger = Ledger::open(&config.db_path).await?;
    let client = FetchClient::new(config)?;
    let token = CancellationToken::new();
    let signals = cancel_on_signal(token.clone());

    let discovered = discover(client, &ledger, &args, &token).await;
    signals.abort();

    if discovered?.is_some() {
        print_stats(&ledger.get_download_stats().await?);
    }
    ledger.close().await;
    Ok(())
}

/// Drain pending jobs; the resume path after an interrupted run
pub async fn handle_download(config: Arc<FetcherConfig>, args: DownloadArgs) -> Result<()> {
    let start_time = Instant::now();
    args.validate().map_err(AppError::generic)?;

    let ledger = Ledger::open(&config.db_path).await?;
    let before = ledger.get_download_stats().await?;
    if before.pending == 0 {
        println!("ℹ️  Nothing pending - run 'catalog_fetcher discover' first");
        print_stats(&before);
        ledger.close().await;
        return Ok(());
    }

    println!(
        "🚀 Downloading {} pending items with {} concurrent downloads...",
        before.pending, config.max_concurrent_downloads
    );
    let pool = WorkerPool::new(config, ledger.clone())?;
    let signals = cancel_on_signal(pool.cancellation_token());
    let downloaded = pool.drain_pending(args.batch_size).await;
    signals.abort();

    let summary = downloaded?;
    if pool.is_cancelled() {
        warn!("Interrupted; {} jobs remain pending", summary.unfinished);
    }
    print_summary(&summary);
    print_stats(&ledger.get_download_stats().await?);
    println!("  Total time: {:?}", start_time.elapsed());
    ledger.close().await;
    Ok(())
}

/// Print ledger statistics
pub async fn handle_stats(config: Arc<FetcherConfig>) -> Result<()> {
    let ledger = Ledger::open(&config.db_path).await?;
    print_stats(&ledger.get_download_stats().await?);
    ledger.close().await;
    Ok(())
}

/// Run one discovery pass; `None` when interrupted by a signal
async fn discover(
    client: FetchClient,
    ledger: &Ledger,
    args: &DiscoverArgs,
    token: &CancellationToken,
) -> Result<Option<DiscoveryReport>> {
    let discoverer = discoverer_for(&args.source, client, args.category.as_deref())?;
    info!(
        "Discovering up to {} items from {}",
        args.limit,
        discoverer.source()
    );

    tokio::select! {
        report = discoverer.discover_content(ledger, args.limit) => {
            let report = report?;
            println!("🔎 Discovery ({}): {}", discoverer.source(), report);
            Ok(Some(report))
        }
        _ = token.cancelled() => {
            println!("🛑 Discovery interrupted");
            Ok(None)
        }
    }
}

fn print_summary(summary: &BatchSummary) {
    println!("\n📥 This run:");
    println!("  Downloaded: {} ({} bytes)", summary.successful, summary.bytes);
    println!("  Failed: {}", summary.failed);
    println!("  Skipped: {}", summary.skipped);
    if summary.unfinished > 0 {
        println!("  Left pending: {}", summary.unfinished);
    }
}

fn print_stats(stats: &DownloadStats) {
    println!("\n📊 Library Summary:");
    println!(
        "  Total files: {} ({} finished)",
        stats.total_files,
        stats.finished()
    );
    println!("  Successful: {}", stats.successful);
    println!("  Failed: {}", stats.failed);
    println!("  Skipped: {}", stats.skipped);
    println!("  Pending: {}", stats.pending);
    println!(
        "  Total size: {:.1} MB",
        stats.total_bytes as f64 / (1024.0 * 1024.0)
    );
}
