//! Bounded-concurrency fetch worker pool
//!
//! Every job runs as its own task; a semaphore of width
//! `max_concurrent_downloads` is the only place a job waits for capacity.
//! Outcomes are written to the ledger by the task that produced them and
//! returned as [`JobOutcome`] values, so one job's failure never affects its
//! siblings. Only ledger errors abort a batch.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::fetch::{destination_path, fetch_to_disk, temp_path, Fetched};
use super::types::{BatchSummary, JobOutcome, SkipReason};
use crate::app::client::{parse_url, FetchClient};
use crate::app::ledger::{JobId, Ledger, PendingJob};
use crate::config::FetcherConfig;
use crate::errors::{LedgerResult, Result};

/// Handle to the worker pool
///
/// Clones share one semaphore, one HTTP client and one cancellation token.
/// When the last clone goes away the token is cancelled and the semaphore
/// closed.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    inner: Arc<PoolInner>,
}

#[derive(Debug)]
struct PoolInner {
    config: Arc<FetcherConfig>,
    ledger: Ledger,
    client: FetchClient,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.semaphore.close();
    }
}

/// Tracks a fetch holding a permit
struct InFlight<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize, peak: &AtomicUsize) -> Self {
        let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}

impl WorkerPool {
    /// Validate the configuration and acquire the pool's resources
    pub fn new(config: Arc<FetcherConfig>, ledger: Ledger) -> Result<Self> {
        config.validate()?;
        let client = FetchClient::new(Arc::clone(&config))?;
        Ok(Self::with_client(config, ledger, client))
    }

    /// Build a pool around an existing client (shared with discovery)
    pub fn with_client(config: Arc<FetcherConfig>, ledger: Ledger, client: FetchClient) -> Self {
        info!(
            "Starting worker pool: {} concurrent downloads into {}",
            config.max_concurrent_downloads,
            config.download_dir.display()
        );
        Self {
            inner: Arc::new(PoolInner {
                semaphore: Arc::new(Semaphore::new(config.max_concurrent_downloads)),
                config,
                ledger,
                client,
                cancel: CancellationToken::new(),
                in_flight: AtomicUsize::new(0),
                peak_in_flight: AtomicUsize::new(0),
            }),
        }
    }

    /// Fetch one job and record its outcome
    ///
    /// Per-job problems come back as [`JobOutcome`]; the only error is a
    /// ledger failure.
    pub async fn download_file(
        &self,
        job_id: JobId,
        url: &str,
        source: &str,
    ) -> LedgerResult<JobOutcome> {
        let job = PendingJob {
            id: job_id,
            url: url.to_string(),
            source: source.to_string(),
            metadata: None,
        };
        self.run_job(job, &self.inner.cancel).await
    }

    /// Run every job under the shared bound and wait for all of them
    pub async fn process_downloads_batch(&self, jobs: Vec<PendingJob>) -> LedgerResult<BatchSummary> {
        let batch_token = self.inner.cancel.child_token();
        // Dropping this future mid-batch cancels the remaining jobs.
        let _cancel_on_drop = batch_token.clone().drop_guard();

        info!("Processing batch of {} jobs", jobs.len());
        let mut tasks = JoinSet::new();
        for job in jobs {
            let pool = self.clone();
            let token = batch_token.clone();
            tasks.spawn(async move { pool.run_job(job, &token).await });
        }

        let mut summary = BatchSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(outcome)) => summary.record(&outcome),
                Ok(Err(e)) => {
                    error!("Ledger failure, aborting batch: {}", e);
                    batch_token.cancel();
                    while tasks.join_next().await.is_some() {}
                    return Err(e);
                }
                Err(join_error) => {
                    error!("Download task died: {}", join_error);
                    summary.unfinished += 1;
                }
            }
        }

        info!(
            "Batch finished: {} successful, {} failed, {} skipped, {} unfinished",
            summary.successful, summary.failed, summary.skipped, summary.unfinished
        );
        Ok(summary)
    }

    /// Pull pending jobs from the ledger until none remain
    ///
    /// Stops early when cancelled or when a batch leaves jobs unfinished, so
    /// the loop never spins on jobs it cannot complete in this run.
    pub async fn drain_pending(&self, batch_size: usize) -> LedgerResult<BatchSummary> {
        let mut total = BatchSummary::default();
        while !self.is_cancelled() {
            let jobs = self.inner.ledger.get_pending_downloads(batch_size).await?;
            if jobs.is_empty() {
                break;
            }
            let summary = self.process_downloads_batch(jobs).await?;
            total.merge(&summary);
            if summary.unfinished > 0 {
                warn!("{} jobs left pending for a later run", summary.unfinished);
                break;
            }
        }
        Ok(total)
    }

    async fn run_job(&self, job: PendingJob, cancel: &CancellationToken) -> LedgerResult<JobOutcome> {
        let inner = &self.inner;

        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(JobOutcome::Cancelled),
            permit = inner.semaphore.acquire() => match permit {
                Ok(permit) => permit,
                Err(_) => return Ok(JobOutcome::Cancelled),
            },
        };
        let _in_flight = InFlight::enter(&inner.in_flight, &inner.peak_in_flight);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => JobOutcome::Cancelled,
            outcome = self.fetch(&job) => outcome,
        };

        if outcome == JobOutcome::Cancelled {
            debug!("Job {} cancelled, left pending: {}", job.id, job.url);
            return Ok(outcome);
        }
        self.record(&job, &outcome).await?;
        Ok(outcome)
    }

    async fn fetch(&self, job: &PendingJob) -> JobOutcome {
        let config = &self.inner.config;
        let client = &self.inner.client;

        let url = match parse_url(&job.url) {
            Ok(url) => url,
            Err(e) => return JobOutcome::Failed { error: e.to_string() },
        };
        let destination = destination_path(&config.download_dir, &job.source, &url);
        let temp = temp_path(&destination, job.id);
        debug!("Downloading job {}: {} -> {}", job.id, url, destination.display());

        let url_ref = &url;
        let destination_ref = destination.as_path();
        let temp_ref = temp.as_path();
        let fetched = client
            .with_retries(url_ref, move || {
                fetch_to_disk(client, url_ref, destination_ref, temp_ref)
            })
            .await;

        match fetched {
            Ok(Fetched::Written { size }) => JobOutcome::Success {
                path: destination,
                filesize: size,
            },
            Ok(Fetched::AdvertisedTooLarge { size }) => {
                JobOutcome::Skipped(SkipReason::AdvertisedTooLarge {
                    size,
                    limit: config.max_file_size,
                })
            }
            Ok(Fetched::ExceededWhileStreaming) => {
                JobOutcome::Skipped(SkipReason::ExceededWhileStreaming {
                    limit: config.max_file_size,
                })
            }
            Err(e) => JobOutcome::Failed { error: e.to_string() },
        }
    }

    async fn record(&self, job: &PendingJob, outcome: &JobOutcome) -> LedgerResult<()> {
        let Some(status) = outcome.status() else {
            return Ok(());
        };
        let (filename, filesize) = match outcome {
            JobOutcome::Success { path, filesize } => {
                info!("Job {} {}", job.id, outcome);
                (Some(path.to_string_lossy().into_owned()), Some(*filesize))
            }
            _ => {
                warn!("Job {} {}: {}", job.id, outcome, job.url);
                (None, None)
            }
        };

        // A row that is no longer pending is left untouched (and logged) by the ledger.
        self.inner
            .ledger
            .update_download_status(job.id, status, filename.as_deref(), filesize)
            .await?;
        Ok(())
    }

    /// Cancel all in-flight and queued work
    pub fn cancel(&self) {
        info!("Cancelling worker pool");
        self.inner.cancel.cancel();
    }

    /// Token that cancels this pool when triggered (e.g. from a signal handler)
    pub fn cancellation_token(&self) -> CancellationToken {
        self.inner.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Fetches currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous fetches observed
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn config(&self) -> &FetcherConfig {
        &self.inner.config
    }

    pub fn ledger(&self) -> &Ledger {
        &self.inner.ledger
    }

    pub fn client(&self) -> &FetchClient {
        &self.inner.client
    }

    /// Cancel outstanding work and release the pool's capacity
    pub fn shutdown(self) {
        self.inner.cancel.cancel();
        self.inner.semaphore.close();
        info!("Worker pool shut down");
    }
}
