//! Outcome types reported by the worker pool

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::app::ledger::JobStatus;

/// Why a job was skipped rather than downloaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Advertised `Content-Length` was over the ceiling; body never read
    AdvertisedTooLarge { size: u64, limit: u64 },
    /// No length advertised and the body outgrew the ceiling while streaming
    ExceededWhileStreaming { limit: u64 },
}

/// What happened to one job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Body written to `path`
    Success { path: PathBuf, filesize: u64 },
    /// Size guard tripped; nothing kept on disk
    Skipped(SkipReason),
    /// Permanent or retry-exhausted failure
    Failed { error: String },
    /// Interrupted before reaching a terminal state; the job stays pending
    Cancelled,
}

impl JobOutcome {
    /// Ledger status this outcome records, if any
    pub fn status(&self) -> Option<JobStatus> {
        match self {
            JobOutcome::Success { .. } => Some(JobStatus::Success),
            JobOutcome::Skipped(_) => Some(JobStatus::Skipped),
            JobOutcome::Failed { .. } => Some(JobStatus::Failed),
            JobOutcome::Cancelled => None,
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::Success { path, filesize } => {
                write!(f, "saved {} ({} bytes)", path.display(), filesize)
            }
            JobOutcome::Skipped(SkipReason::AdvertisedTooLarge { size, limit }) => {
                write!(f, "skipped: advertised {} bytes > limit {}", size, limit)
            }
            JobOutcome::Skipped(SkipReason::ExceededWhileStreaming { limit }) => {
                write!(f, "skipped: body exceeded limit {} while streaming", limit)
            }
            JobOutcome::Failed { error } => write!(f, "failed: {}", error),
            JobOutcome::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome counts for one or more batches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub successful: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Jobs that were cancelled or whose task died; still pending in the ledger
    pub unfinished: u64,
    /// Bytes written by successful jobs
    pub bytes: u64,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Success { filesize, .. } => {
                self.successful += 1;
                self.bytes += filesize;
            }
            JobOutcome::Skipped(_) => self.skipped += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
            JobOutcome::Cancelled => self.unfinished += 1,
        }
    }

    pub fn merge(&mut self, other: &BatchSummary) {
        self.successful += other.successful;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.unfinished += other.unfinished;
        self.bytes += other.bytes;
    }

    pub fn total(&self) -> u64 {
        self.successful + self.failed + self.skipped + self.unfinished
    }
}
