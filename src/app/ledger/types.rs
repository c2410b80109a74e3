//! Row types for the job ledger

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;

/// Job identifier assigned by the ledger on insertion
pub type JobId = i64;

/// Lifecycle status of a download job
///
/// `Pending` is the only non-terminal state. A job leaves it exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Success => "success",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            "skipped" => Ok(JobStatus::Skipped),
            other => Err(LedgerError::UnknownStatus {
                value: other.to_string(),
            }),
        }
    }
}

/// A job waiting to be fetched, as handed to the worker pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJob {
    pub id: JobId,
    pub url: String,
    pub source: String,
    /// Opaque payload stored at registration
    pub metadata: Option<String>,
}

/// Full ledger row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadJob {
    pub id: JobId,
    pub source: String,
    pub url: String,
    pub metadata: Option<String>,
    pub status: JobStatus,
    pub filename: Option<String>,
    pub filesize: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

/// Aggregate counts over the whole ledger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadStats {
    pub total_files: u64,
    pub successful: u64,
    pub failed: u64,
    pub skipped: u64,
    pub pending: u64,
    /// Sum of `filesize` over successful rows only
    pub total_bytes: u64,
}

impl DownloadStats {
    /// Jobs that reached a terminal state
    pub fn finished(&self) -> u64 {
        self.successful + self.failed + self.skipped
    }
}

impl fmt::Display for DownloadStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} files: {} successful, {} failed, {} skipped, {} pending ({} bytes)",
            self.total_files,
            self.successful,
            self.failed,
            self.skipped,
            self.pending,
            self.total_bytes
        )
    }
}
