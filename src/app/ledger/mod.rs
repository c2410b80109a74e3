//! Durable job ledger
//!
//! One row per unique URL, tracking the job from `pending` to exactly one
//! terminal status. The ledger is the only place job state lives, so a
//! restarted process resumes from [`Ledger::get_pending_downloads`].

mod store;
mod types;

#[cfg(test)]
mod tests;

pub use store::Ledger;
pub use types::{DownloadJob, DownloadStats, JobId, JobStatus, PendingJob};
