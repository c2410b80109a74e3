//! Tests for the job ledger

use tempfile::TempDir;

use super::{JobStatus, Ledger};
use crate::errors::LedgerError;

#[tokio::test]
async fn first_registration_wins() {
    let ledger = Ledger::open_in_memory().await.unwrap();
    let url = "https://www.gutenberg.org/cache/epub/84/pg84.txt";

    assert!(ledger
        .add_download_entry("gutenberg", url, Some(r#"{"id":84}"#))
        .await
        .unwrap());
    assert!(!ledger.add_download_entry("gutenberg", url, None).await.unwrap());
    assert!(!ledger.add_download_entry("other", url, None).await.unwrap());

    let stats = ledger.get_download_stats().await.unwrap();
    assert_eq!(stats.total_files, 1);
    assert_eq!(stats.pending, 1);

    let pending = ledger.get_pending_downloads(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].source, "gutenberg");
    assert_eq!(pending[0].metadata.as_deref(), Some(r#"{"id":84}"#));
}

#[tokio::test]
async fn terminal_rows_are_never_re_added() {
    let ledger = Ledger::open_in_memory().await.unwrap();
    let url = "https://example.com/a.txt";
    ledger.add_download_entry("test", url, None).await.unwrap();
    let id = ledger.get_pending_downloads(1).await.unwrap()[0].id;

    ledger
        .update_download_status(id, JobStatus::Failed, None, None)
        .await
        .unwrap();

    assert!(!ledger.add_download_entry("test", url, None).await.unwrap());
    assert!(ledger.get_pending_downloads(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_registration_inserts_exactly_one_row() {
    let dir = TempDir::new().unwrap();
    let ledger = Ledger::open(&dir.path().join("ledger.db")).await.unwrap();
    let url = "https://example.com/contended.txt";

    let mut handles = Vec::new();
    for i in 0..16 {
        let ledger = ledger.clone();
        handles.push(tokio::spawn(async move {
            ledger
                .add_download_entry(&format!("source-{}", i), url, None)
                .await
                .unwrap()
        }));
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            inserted += 1;
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(ledger.get_download_stats().await.unwrap().total_files, 1);
}

#[tokio::test]
async fn pending_listing_is_ordered_bounded_and_pending_only() {
    let ledger = Ledger::open_in_memory().await.unwrap();
    for i in 0..5 {
        ledger
            .add_download_entry("test", &format!("https://example.com/{}.txt", i), None)
            .await
            .unwrap();
    }

    let first = ledger.get_pending_downloads(3).await.unwrap();
    assert_eq!(first.len(), 3);
    assert!(first.windows(2).all(|w| w[0].id < w[1].id));
    assert_eq!(first[0].url, "https://example.com/0.txt");

    ledger
        .update_download_status(first[0].id, JobStatus::Success, Some("0.txt"), Some(10))
        .await
        .unwrap();
    ledger
        .update_download_status(first[1].id, JobStatus::Skipped, None, None)
        .await
        .unwrap();

    let remaining = ledger.get_pending_downloads(10).await.unwrap();
    assert_eq!(remaining.len(), 3);
    assert_eq!(remaining[0].url, "https://example.com/2.txt");
    for job in &remaining {
        let row = ledger.get_download(job.id).await.unwrap().unwrap();
        assert_eq!(row.status, JobStatus::Pending);
    }
}

#[tokio::test]
async fn terminal_status_is_immutable() {
    let ledger = Ledger::open_in_memory().await.unwrap();
    ledger
        .add_download_entry("test", "https://example.com/x.bin", None)
        .await
        .unwrap();
    let id = ledger.get_pending_downloads(1).await.unwrap()[0].id;

    assert!(ledger
        .update_download_status(id, JobStatus::Success, Some("x.bin"), Some(42))
        .await
        .unwrap());
    assert!(!ledger
        .update_download_status(id, JobStatus::Failed, None, None)
        .await
        .unwrap());

    let row = ledger.get_download(id).await.unwrap().unwrap();
    assert_eq!(row.status, JobStatus::Success);
    assert_eq!(row.filename.as_deref(), Some("x.bin"));
    assert_eq!(row.filesize, Some(42));
}

#[tokio::test]
async fn pending_is_not_a_valid_target_status() {
    let ledger = Ledger::open_in_memory().await.unwrap();
    let result = ledger
        .update_download_status(1, JobStatus::Pending, None, None)
        .await;
    assert!(matches!(result, Err(LedgerError::InvalidStatus { .. })));
}

#[tokio::test]
async fn stats_sum_bytes_over_successful_rows_only() {
    let ledger = Ledger::open_in_memory().await.unwrap();
    for i in 0..4 {
        ledger
            .add_download_entry("test", &format!("https://example.com/{}", i), None)
            .await
            .unwrap();
    }
    let jobs = ledger.get_pending_downloads(4).await.unwrap();

    ledger
        .update_download_status(jobs[0].id, JobStatus::Success, Some("a"), Some(100))
        .await
        .unwrap();
    ledger
        .update_download_status(jobs[1].id, JobStatus::Success, Some("b"), Some(23))
        .await
        .unwrap();
    // A failed row carrying a size must not count towards total_bytes.
    ledger
        .update_download_status(jobs[2].id, JobStatus::Failed, Some("c"), Some(999))
        .await
        .unwrap();

    let stats = ledger.get_download_stats().await.unwrap();
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.skipped, 0);
    assert_eq!(stats.pending, 1);
    assert_eq!(stats.total_bytes, 123);
    assert_eq!(
        stats.total_files,
        stats.successful + stats.failed + stats.skipped + stats.pending
    );
}

#[tokio::test]
async fn reopened_ledger_resumes_pending_jobs() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("state").join("ledger.db");

    {
        let ledger = Ledger::open(&path).await.unwrap();
        ledger
            .add_download_entry("test", "https://example.com/done", None)
            .await
            .unwrap();
        ledger
            .add_download_entry("test", "https://example.com/todo", None)
            .await
            .unwrap();
        let done = ledger.get_pending_downloads(1).await.unwrap()[0].id;
        ledger
            .update_download_status(done, JobStatus::Success, Some("done"), Some(1))
            .await
            .unwrap();
        ledger.close().await;
    }

    let ledger = Ledger::open(&path).await.unwrap();
    let pending = ledger.get_pending_downloads(10).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].url, "https://example.com/todo");
}
