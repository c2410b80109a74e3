//! Discovery against served listing pages, then the full pipeline

mod common;

use std::sync::Arc;
use std::time::Duration;

use catalog_fetcher::app::discovery::{
    ArxivDiscoverer, Discoverer, DiscoveryReport, GutenbergDiscoverer,
};
use catalog_fetcher::app::{FetchClient, Ledger, WorkerPool};
use catalog_fetcher::config::FetcherConfig;
use catalog_fetcher::errors::DiscoveryError;
use common::{Route, TestServer};
use tempfile::TempDir;
use url::Url;

const GUTENBERG_PAGE_1: &str = r#"
<html><body><ul>
  <li class="booklink"><a class="link" href="/ebooks/84"><span class="title">Frankenstein</span></a></li>
  <li class="booklink"><a class="link" href="/ebooks/1342"><span class="title">Pride and Prejudice</span></a></li>
</ul>
<a title="Go to the next page of results." href="/listing?page=2">Next</a>
</body></html>
"#;

const GUTENBERG_PAGE_2: &str = r#"
<html><body><ul>
  <li class="booklink"><a class="link" href="/ebooks/1342"><span class="title">Pride and Prejudice</span></a></li>
  <li class="booklink"><a class="link" href="/ebooks/11"><span class="title">Alice's Adventures in Wonderland</span></a></li>
</ul></body></html>
"#;

const ARXIV_LISTING: &str = r#"
<dl>
  <dt><a href="/abs/2401.00001">arXiv:2401.00001</a></dt>
  <dt><a href="/abs/2401.00002">arXiv:2401.00002</a></dt>
</dl>
"#;

fn config(dir: &TempDir) -> Arc<FetcherConfig> {
    Arc::new(
        FetcherConfig::builder()
            .download_dir(dir.path().join("library"))
            .db_path(dir.path().join("ledger.db"))
            .request_delay(Duration::ZERO)
            .max_retries(0)
            .build()
            .unwrap(),
    )
}

async fn gutenberg_server() -> TestServer {
    let server = TestServer::start().await;
    server.route("/listing", Route::html(GUTENBERG_PAGE_1));
    server.route("/listing?page=2", Route::html(GUTENBERG_PAGE_2));
    server
}

fn gutenberg(server: &TestServer, client: FetchClient) -> GutenbergDiscoverer {
    let listing = Url::parse(&server.url("/listing")).unwrap();
    GutenbergDiscoverer::with_listing(client, listing).mirror(server.base())
}

#[tokio::test]
async fn test_second_run_adds_nothing() {
    let dir = TempDir::new().unwrap();
    let server = gutenberg_server().await;
    let config = config(&dir);
    let ledger = Ledger::open(&config.db_path).await.unwrap();
    let discoverer = gutenberg(&server, FetchClient::new(config).unwrap());

    let first = discoverer.discover_content(&ledger, 100).await.unwrap();
    assert_eq!(
        first,
        DiscoveryReport {
            discovered: 3,
            added: 3,
            duplicates: 0
        }
    );

    let second = discoverer.discover_content(&ledger, 100).await.unwrap();
    assert_eq!(second.added, 0);
    assert_eq!(second.duplicates, 3);
    assert_eq!(ledger.get_download_stats().await.unwrap().total_files, 3);
}

#[tokio::test]
async fn test_limit_and_page_budget() {
    let dir = TempDir::new().unwrap();
    let server = gutenberg_server().await;
    let config = config(&dir);
    let ledger = Ledger::open(&config.db_path).await.unwrap();
    let client = FetchClient::new(config).unwrap();

    let report = gutenberg(&server, client.clone())
        .discover_content(&ledger, 1)
        .await
        .unwrap();
    assert_eq!(report.discovered, 1);
    assert_eq!(server.hits("/listing?page=2"), 0);

    let report = gutenberg(&server, client)
        .max_pages(1)
        .discover_content(&ledger, 100)
        .await
        .unwrap();
    assert_eq!(report.discovered, 2);
    assert_eq!(report.added, 1);
    assert_eq!(server.hits("/listing?page=2"), 0);
}

#[tokio::test]
async fn test_metadata_is_stored_verbatim() {
    let dir = TempDir::new().unwrap();
    let server = gutenberg_server().await;
    let config = config(&dir);
    let ledger = Ledger::open(&config.db_path).await.unwrap();

    gutenberg(&server, FetchClient::new(config).unwrap())
        .discover_content(&ledger, 1)
        .await
        .unwrap();

    let job = ledger.get_pending_downloads(1).await.unwrap().remove(0);
    assert_eq!(job.source, "gutenberg");
    assert_eq!(job.url, server.url("/cache/epub/84/pg84.txt"));
    let metadata: serde_json::Value =
        serde_json::from_str(job.metadata.as_deref().unwrap()).unwrap();
    assert_eq!(metadata["id"], 84);
    assert_eq!(metadata["title"], "Frankenstein");
    assert_eq!(metadata["listing"], server.url("/listing"));
}

#[tokio::test]
async fn test_listing_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let server = TestServer::start().await;
    server.route("/list/cs.DL/recent", Route::status(500));
    let config = config(&dir);
    let ledger = Ledger::open(&config.db_path).await.unwrap();

    let listing = Url::parse(&server.url("/list/cs.DL/recent")).unwrap();
    let discoverer = ArxivDiscoverer::with_listing(FetchClient::new(config).unwrap(), listing);
    match discoverer.discover_content(&ledger, 10).await {
        Err(DiscoveryError::Fetch { url, .. }) => assert!(url.ends_with("/list/cs.DL/recent")),
        other => panic!("expected a fetch error, got {:?}", other),
    }
    assert_eq!(ledger.get_download_stats().await.unwrap().total_files, 0);
}

#[tokio::test]
async fn test_discover_then_download() {
    let dir = TempDir::new().unwrap();
    let server = gutenberg_server().await;
    server.route("/list/cs.DL/recent", Route::html(ARXIV_LISTING));
    server.route("/cache/epub/84/pg84.txt", Route::ok("It was on a dreary night of November"));
    server.route("/cache/epub/1342/pg1342.txt", Route::ok("It is a truth universally acknowledged"));
    server.route("/cache/epub/11/pg11.txt", Route::status(404));
    server.route("/pdf/2401.00001.pdf", Route::ok("%PDF-1.7"));
    server.route("/pdf/2401.00002.pdf", Route::ok("%PDF-1.4"));

    let config = config(&dir);
    let ledger = Ledger::open(&config.db_path).await.unwrap();
    let client = FetchClient::new(Arc::clone(&config)).unwrap();

    let listing = Url::parse(&server.url("/list/cs.DL/recent")).unwrap();
    let discoverers: Vec<Box<dyn Discoverer>> = vec![
        Box::new(gutenberg(&server, client.clone())),
        Box::new(ArxivDiscoverer::with_listing(client.clone(), listing).base(server.base())),
    ];
    for discoverer in &discoverers {
        discoverer.discover_content(&ledger, 10).await.unwrap();
    }

    let pool = WorkerPool::with_client(config, ledger.clone(), client);
    let summary = pool.drain_pending(2).await.unwrap();
    assert_eq!(summary.successful, 4);
    assert_eq!(summary.failed, 1);

    let library = dir.path().join("library");
    assert!(library.join("gutenberg/pg84.txt").exists());
    assert!(library.join("gutenberg/pg1342.txt").exists());
    assert!(!library.join("gutenberg/pg11.txt").exists());
    assert_eq!(
        std::fs::read_to_string(library.join("arxiv/2401.00002.pdf")).unwrap(),
        "%PDF-1.4"
    );

    let stats = ledger.get_download_stats().await.unwrap();
    assert_eq!(stats.total_files, 5);
    assert_eq!(stats.pending, 0);

    // Rediscovery after the downloads never re-enqueues anything
    for discoverer in &discoverers {
        let report = discoverer.discover_content(&ledger, 10).await.unwrap();
        assert_eq!(report.added, 0);
    }
    assert_eq!(ledger.get_download_stats().await.unwrap().pending, 0);
}
