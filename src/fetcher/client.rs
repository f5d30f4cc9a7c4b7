//! Streaming HTTP downloader writing into the download directory

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use tokio::fs::{self, File};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::error::{FetchError, Result};
use super::filename::sanitize_filename;
use super::{DownloadResult, Fetcher, Progress, ProgressFn};
use crate::config::DownloadConfig;
use crate::humanize::format_size;

/// Removes a partially written file unless disarmed. Runs on error paths and
/// when the transfer future is dropped by the timeout.
struct PartialFile {
    path: PathBuf,
    keep: bool,
    armed: bool,
}

impl PartialFile {
    fn new(path: PathBuf, keep: bool) -> Self {
        Self {
            path,
            keep,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if self.keep {
            warn!(path = %self.path.display(), "keeping partial download");
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed partial download"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove partial download"),
        }
    }
}

/// Suffix of in-flight downloads; only finished files carry their final name
const PART_SUFFIX: &str = "part";

/// Downloads resolved files into a single local directory
///
/// Bytes are streamed into `<name>.<id>.part` and renamed onto the target
/// once flushed, so a file under its final name is always complete.
/// Every returned result holds a lease on its path; `release` deletes the
/// file only when the last holder lets go.
#[derive(Debug, Clone)]
pub struct FileFetcher {
    client: Client,
    directory: PathBuf,
    chunk_size: usize,
    timeout: Duration,
    keep_failed: bool,
    cleanup: bool,
    leases: Arc<Mutex<HashMap<PathBuf, usize>>>,
}

impl FileFetcher {
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        // No per-request timeout; the whole transfer is bounded below.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .user_agent(concat!("teradrop/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(FetchError::from_reqwest)?;

        Ok(Self {
            client,
            directory: config.directory.clone(),
            chunk_size: config.chunk_size.as_usize().max(1),
            timeout: config.timeout(),
            keep_failed: config.keep_failed,
            cleanup: config.cleanup,
            leases: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full target path for a resolver-supplied name
    pub fn target_path(&self, target_name: &str) -> PathBuf {
        self.directory.join(sanitize_filename(target_name))
    }

    /// Unique sibling the body is streamed into before the rename
    fn part_path(target: &Path) -> PathBuf {
        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        target.with_file_name(format!("{name}.{}.{PART_SUFFIX}", Uuid::now_v7().simple()))
    }

    fn acquire(&self, path: &Path) {
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        *leases.entry(path.to_path_buf()).or_insert(0) += 1;
    }

    /// Drop one lease. With `remove`, the file goes once the last lease is
    /// gone; removal happens under the lease lock so a concurrent `fetch`
    /// either keeps the file alive or finds it missing.
    fn surrender(&self, path: &Path, remove: bool) {
        let mut leases = self.leases.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(count) = leases.get_mut(path) {
            if *count > 1 {
                *count -= 1;
                debug!(path = %path.display(), holders = *count, "file still in use");
                return;
            }
        }
        leases.remove(path);

        if !remove {
            return;
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "cleaned up delivered file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "cleanup failed"),
        }
    }

    async fn download(
        &self,
        url: &str,
        path: &Path,
        size_limit: u64,
        on_progress: Option<&ProgressFn>,
    ) -> Result<DownloadResult> {
        if fs::try_exists(path).await.unwrap_or(false) {
            info!(path = %path.display(), "file already present, skipping download");
            return Ok(DownloadResult {
                path: path.to_path_buf(),
                bytes_written: 0,
                reused: true,
            });
        }

        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| FetchError::io(&self.directory, e))?;

        debug!(url, path = %path.display(), limit = size_limit, "starting download");

        let bytes_written = tokio::time::timeout(
            self.timeout,
            self.transfer(url, path, size_limit, on_progress),
        )
        .await
        .map_err(|_| {
            warn!(path = %path.display(), timeout = ?self.timeout, "download timed out");
            FetchError::Timeout(self.timeout)
        })??;

        info!(path = %path.display(), bytes = bytes_written, size = %format_size(bytes_written), "download complete");

        Ok(DownloadResult {
            path: path.to_path_buf(),
            bytes_written,
            reused: false,
        })
    }

    async fn transfer(
        &self,
        url: &str,
        path: &Path,
        size_limit: u64,
        on_progress: Option<&ProgressFn>,
    ) -> Result<u64> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let total = response.content_length().filter(|len| *len > 0);
        if let Some(declared) = total.filter(|len| *len > size_limit) {
            return Err(FetchError::TooLarge {
                size: declared,
                limit: size_limit,
            });
        }

        let part = Self::part_path(path);
        let file = File::create(&part).await.map_err(|e| FetchError::io(&part, e))?;
        let mut guard = PartialFile::new(part.clone(), self.keep_failed);
        let mut writer = BufWriter::with_capacity(self.chunk_size, file);
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;
        let mut last_reported: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(FetchError::from_reqwest)?;

            written += chunk.len() as u64;
            if written > size_limit {
                return Err(FetchError::TooLarge {
                    size: written,
                    limit: size_limit,
                });
            }

            writer
                .write_all(&chunk)
                .await
                .map_err(|e| FetchError::io(&part, e))?;

            if let (Some(report), Some(total)) = (on_progress, total) {
                if written - last_reported >= self.chunk_size as u64 || written >= total {
                    last_reported = written;
                    report(Progress::new(written, total));
                }
            }
        }

        writer.flush().await.map_err(|e| FetchError::io(&part, e))?;
        writer
            .into_inner()
            .sync_all()
            .await
            .map_err(|e| FetchError::io(&part, e))?;

        fs::rename(&part, path)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        guard.disarm();
        Ok(written)
    }
}

#[async_trait]
impl Fetcher for FileFetcher {
    #[instrument(skip(self, on_progress))]
    async fn fetch(
        &self,
        url: &str,
        target_name: &str,
        size_limit: u64,
        on_progress: Option<&ProgressFn>,
    ) -> Result<DownloadResult> {
        let path = self.target_path(target_name);

        // Taken before the existence check so a concurrent release cannot
        // delete the file between the check and the caller using it
        self.acquire(&path);
        let result = self.download(url, &path, size_limit, on_progress).await;
        if result.is_err() {
            self.surrender(&path, false);
        }
        result
    }

    async fn release(&self, result: &DownloadResult) {
        self.surrender(&result.path, self.cleanup);
    }

    async fn cleanup_all(&self) -> usize {
        if !self.cleanup {
            return 0;
        }

        let mut entries = match fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return 0,
            Err(e) => {
                warn!(dir = %self.directory.display(), error = %e, "cannot read download directory");
                return 0;
            }
        };

        let mut removed = 0;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }
            match fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %entry.path().display(), error = %e, "cleanup failed"),
            }
        }

        info!(removed, dir = %self.directory.display(), "download directory cleaned");
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher(dir: &TempDir, keep_failed: bool) -> FileFetcher {
        let config = DownloadConfig {
            directory: dir.path().join("downloads"),
            chunk_size: ByteSize(4),
            timeout_secs: 5,
            keep_failed,
            ..DownloadConfig::default()
        };
        FileFetcher::new(&config).unwrap()
    }

    /// Answers every request with a 200 whose body is cut short: `declared`
    /// bytes are announced (or none, reading until close) but only `body` is
    /// sent. The connection is then closed, or held open when `stall` is set.
    async fn truncating_server(declared: Option<u64>, body: &'static [u8], stall: bool) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut request = [0u8; 2048];
                    let _ = socket.read(&mut request).await;
                    let head = match declared {
                        Some(len) => format!("HTTP/1.1 200 OK\r\nContent-Length: {len}\r\n\r\n"),
                        None => "HTTP/1.1 200 OK\r\nConnection: close\r\n\r\n".to_string(),
                    };
                    let _ = socket.write_all(head.as_bytes()).await;
                    let _ = socket.write_all(body).await;
                    let _ = socket.flush().await;
                    if stall {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                });
            }
        });
        format!("http://{addr}/file")
    }

    fn files_in(dir: &Path) -> Vec<String> {
        match std::fs::read_dir(dir) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    async fn serve_body(server: &MockServer, body: &[u8]) -> String {
        Mock::given(method("GET"))
            .and(path("/good"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
            .mount(server)
            .await;
        format!("{}/good", server.uri())
    }

    #[tokio::test]
    async fn test_fetch_writes_body_and_reports_progress() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/file.bin"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"0123456789".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let report = move |p: Progress| sink.lock().unwrap().push(p);

        let result = fetcher
            .fetch(&format!("{}/file.bin", server.uri()), "file.bin", 1024, Some(&report))
            .await
            .unwrap();

        assert_eq!(result.bytes_written, 10);
        assert!(!result.reused);
        assert_eq!(std::fs::read(&result.path).unwrap(), b"0123456789");

        let seen = seen.lock().unwrap();
        let last = seen.last().expect("progress reported");
        assert_eq!(last.bytes, 10);
        assert_eq!(last.total, 10);
        assert!((last.percent - 100.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_existing_target_returned_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);
        std::fs::create_dir_all(fetcher.directory()).unwrap();
        std::fs::write(fetcher.target_path("cached.mp4"), b"old").unwrap();

        let result = fetcher
            .fetch(&format!("{}/x", server.uri()), "cached.mp4", 1024, None)
            .await
            .unwrap();

        assert!(result.reused);
        assert_eq!(result.bytes_written, 0);
        assert_eq!(std::fs::read(&result.path).unwrap(), b"old");
    }

    #[tokio::test]
    async fn test_declared_length_over_limit_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);

        let result = fetcher
            .fetch(&format!("{}/big", server.uri()), "big.bin", 16, None)
            .await;

        assert!(matches!(result, Err(FetchError::TooLarge { size: 64, limit: 16 })));
        assert!(!fetcher.target_path("big.bin").exists());
    }

    #[tokio::test]
    async fn test_non_200_is_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);

        let result = fetcher
            .fetch(&format!("{}/denied", server.uri()), "denied.bin", 1024, None)
            .await;

        assert!(matches!(result, Err(FetchError::HttpStatus(403))));
        assert!(!fetcher.target_path("denied.bin").exists());
    }

    #[tokio::test]
    async fn test_timeout_removes_partial_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(b"slow".to_vec())
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let config = DownloadConfig {
            directory: dir.path().to_path_buf(),
            timeout_secs: 1,
            ..DownloadConfig::default()
        };
        let fetcher = FileFetcher::new(&config).unwrap();

        let result = fetcher
            .fetch(&format!("{}/slow", server.uri()), "slow.bin", 1024, None)
            .await;

        assert!(matches!(result, Err(FetchError::Timeout(_))));
        assert!(!fetcher.target_path("slow.bin").exists());
    }

    #[tokio::test]
    async fn test_truncated_body_removes_partial_file() {
        let url = truncating_server(Some(100), b"0123456789", false).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);

        let result = fetcher.fetch(&url, "movie.mp4", 1024, None).await;

        assert!(matches!(result, Err(FetchError::Transport(_))), "{result:?}");
        assert!(files_in(fetcher.directory()).is_empty());
    }

    #[tokio::test]
    async fn test_kept_partial_file_is_never_reused() {
        let url = truncating_server(Some(100), b"0123456789", false).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, true);

        assert!(fetcher.fetch(&url, "movie.mp4", 1024, None).await.is_err());

        let left = files_in(fetcher.directory());
        assert_eq!(left.len(), 1);
        assert!(left[0].starts_with("movie.mp4.") && left[0].ends_with(".part"));
        assert!(!fetcher.target_path("movie.mp4").exists());

        let server = MockServer::start().await;
        let good = serve_body(&server, b"complete body").await;
        let result = fetcher.fetch(&good, "movie.mp4", 1024, None).await.unwrap();

        assert!(!result.reused);
        assert_eq!(result.bytes_written, 13);
        assert_eq!(std::fs::read(&result.path).unwrap(), b"complete body");
    }

    #[tokio::test]
    async fn test_stalled_transfer_times_out_and_cleans_up() {
        let url = truncating_server(Some(100), b"0123456789", true).await;
        let dir = TempDir::new().unwrap();
        let config = DownloadConfig {
            directory: dir.path().join("downloads"),
            timeout_secs: 1,
            ..DownloadConfig::default()
        };
        let fetcher = FileFetcher::new(&config).unwrap();

        let result = fetcher.fetch(&url, "movie.mp4", 1024, None).await;

        assert!(matches!(result, Err(FetchError::Timeout(_))));
        assert!(files_in(fetcher.directory()).is_empty());
    }

    #[tokio::test]
    async fn test_undeclared_length_over_limit() {
        static BODY: [u8; 64] = [7u8; 64];
        let url = truncating_server(None, &BODY, false).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);

        let result = fetcher.fetch(&url, "big.bin", 16, None).await;

        assert!(matches!(result, Err(FetchError::TooLarge { limit: 16, .. })), "{result:?}");
        assert!(files_in(fetcher.directory()).is_empty());
    }

    #[tokio::test]
    async fn test_in_flight_download_is_not_reused() {
        let stalled = truncating_server(Some(100), b"0123456789", true).await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);

        let first = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch(&stalled, "video.mp4", 1024, None).await })
        };
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(!fetcher.target_path("video.mp4").exists());

        let server = MockServer::start().await;
        let good = serve_body(&server, b"second file").await;
        let result = fetcher.fetch(&good, "video.mp4", 1024, None).await.unwrap();

        assert!(!result.reused);
        assert_eq!(std::fs::read(&result.path).unwrap(), b"second file");
        first.abort();
    }

    #[tokio::test]
    async fn test_release_waits_for_last_holder() {
        let server = MockServer::start().await;
        let good = serve_body(&server, b"shared").await;
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);

        let first = fetcher.fetch(&good, "shared.mp4", 1024, None).await.unwrap();
        let second = fetcher.fetch(&good, "shared.mp4", 1024, None).await.unwrap();
        assert!(second.reused);

        fetcher.release(&first).await;
        assert!(second.path.exists());

        fetcher.release(&second).await;
        assert!(!second.path.exists());
    }

    #[tokio::test]
    async fn test_release_and_cleanup_all() {
        let dir = TempDir::new().unwrap();
        let fetcher = fetcher(&dir, false);
        std::fs::create_dir_all(fetcher.directory()).unwrap();
        std::fs::write(fetcher.target_path("a.bin"), b"a").unwrap();
        std::fs::write(fetcher.target_path("b.bin"), b"b").unwrap();
        std::fs::create_dir(fetcher.directory().join("nested")).unwrap();

        let delivered = DownloadResult {
            path: fetcher.target_path("a.bin"),
            bytes_written: 1,
            reused: false,
        };
        fetcher.release(&delivered).await;
        assert!(!delivered.path.exists());

        assert_eq!(fetcher.cleanup_all().await, 1);
        assert!(!fetcher.target_path("b.bin").exists());
        assert!(fetcher.directory().join("nested").exists());
    }

    #[tokio::test]
    async fn test_cleanup_disabled_keeps_files() {
        let dir = TempDir::new().unwrap();
        let config = DownloadConfig {
            directory: dir.path().to_path_buf(),
            cleanup: false,
            ..DownloadConfig::default()
        };
        let fetcher = FileFetcher::new(&config).unwrap();
        std::fs::write(fetcher.target_path("keep.bin"), b"k").unwrap();

        let result = DownloadResult {
            path: fetcher.target_path("keep.bin"),
            bytes_written: 1,
            reused: false,
        };
        fetcher.release(&result).await;
        assert_eq!(fetcher.cleanup_all().await, 0);
        assert!(result.path.exists());
    }

    #[test]
    fn test_partial_file_guard() {
        let dir = TempDir::new().unwrap();
        let doomed = dir.path().join("doomed");
        let kept = dir.path().join("kept");
        let done = dir.path().join("done");
        for p in [&doomed, &kept, &done] {
            std::fs::write(p, b"partial").unwrap();
        }

        drop(PartialFile::new(doomed.clone(), false));
        drop(PartialFile::new(kept.clone(), true));
        let mut guard = PartialFile::new(done.clone(), false);
        guard.disarm();
        drop(guard);

        assert!(!doomed.exists());
        assert!(kept.exists());
        assert!(done.exists());
    }
}
