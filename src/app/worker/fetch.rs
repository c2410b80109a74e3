//! Streaming a single response body to disk
//!
//! Bodies are written to a per-job `<destination>.<job_id>.part` through a
//! buffer of `chunk_size` bytes and published once complete. Publishing never
//! replaces an existing file: when two jobs map to the same destination the
//! later one fails with [`DownloadError::DestinationExists`]. A
//! [`PartialFile`] guard removes the temp file on every exit path, including
//! task abort.

use std::path::{Path, PathBuf};

use futures::StreamExt;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use url::Url;

use crate::app::client::FetchClient;
use crate::constants::files;
use crate::app::ledger::JobId;
use crate::errors::{DownloadError, DownloadResult};

/// Result of one successful fetch attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    Written { size: u64 },
    AdvertisedTooLarge { size: u64 },
    ExceededWhileStreaming,
}

/// `<download_dir>/<source>/<basename(url)>`
pub fn destination_path(download_dir: &Path, source: &str, url: &Url) -> PathBuf {
    download_dir
        .join(sanitize_component(source))
        .join(sanitize_component(&url_basename(url)))
}

/// Temp path used while job `job_id` streams its body
pub fn temp_path(destination: &Path, job_id: JobId) -> PathBuf {
    let mut name = destination.as_os_str().to_owned();
    name.push(format!(".{}{}", job_id, files::TEMP_FILE_SUFFIX));
    PathBuf::from(name)
}

/// Last non-empty path segment of a URL
pub fn url_basename(url: &Url) -> String {
    url.path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|segment| segment.to_string())
        .unwrap_or_else(|| files::FALLBACK_FILE_NAME.to_string())
}

fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.trim() {
        "" | "." | ".." => files::FALLBACK_FILE_NAME.to_string(),
        name => name.to_string(),
    }
}

/// Removes its temp file when dropped
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
}

impl PartialFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

/// One attempt: request, size check, stream, publish
pub async fn fetch_to_disk(
    client: &FetchClient,
    url: &Url,
    destination: &Path,
    temp: &Path,
) -> DownloadResult<Fetched> {
    let config = client.config();
    let max_file_size = config.max_file_size;

    let response = client.send(url).await?;
    if let Some(size) = response.content_length() {
        if size > max_file_size {
            // Dropping the response closes the body unread.
            return Ok(Fetched::AdvertisedTooLarge { size });
        }
    }

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = PartialFile::new(temp.to_path_buf());
    let file = File::create(partial.path()).await?;
    let mut writer = BufWriter::with_capacity(config.chunk_size, file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    while let Some(chunk) = client.read_timeout("body data", stream.next()).await? {
        let chunk = chunk?;
        written += chunk.len() as u64;
        if written > max_file_size {
            return Ok(Fetched::ExceededWhileStreaming);
        }
        writer.write_all(&chunk).await?;
    }

    writer.flush().await?;
    drop(writer);
    publish(partial.path(), destination).await?;

    Ok(Fetched::Written { size: written })
}

/// Link the finished temp file into place, refusing to overwrite
///
/// The link either creates `destination` or fails, so two jobs racing for
/// one path cannot both succeed. The temp file is removed by its guard.
async fn publish(temp: &Path, destination: &Path) -> DownloadResult<()> {
    match tokio::fs::hard_link(temp, destination).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            Err(DownloadError::DestinationExists {
                path: destination.to_path_buf(),
            })
        }
        Err(e) => Err(e.into()),
    }
}
