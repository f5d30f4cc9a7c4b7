//! File download into local storage
//!
//! Streams a resolved download URL to the download directory with a size
//! cap and an overall deadline. Partial files never survive a failed
//! transfer unless `download.keep_failed` is set.

mod client;
mod error;
mod filename;

use std::path::PathBuf;

use async_trait::async_trait;

pub use client::FileFetcher;
pub use error::FetchError;
pub use filename::sanitize_filename;

/// A completely written local file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadResult {
    pub path: PathBuf,
    /// Zero when the file was already present
    pub bytes_written: u64,
    pub reused: bool,
}

/// Snapshot passed to progress callbacks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub percent: f64,
    pub bytes: u64,
    pub total: u64,
}

impl Progress {
    pub fn new(bytes: u64, total: u64) -> Self {
        let percent = if total == 0 {
            0.0
        } else {
            (bytes as f64 / total as f64 * 100.0).min(100.0)
        };
        Self {
            percent,
            bytes,
            total,
        }
    }
}

pub type ProgressFn = dyn Fn(Progress) + Send + Sync;

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Download `url` as `target_name`, failing above `size_limit` bytes
    async fn fetch(
        &self,
        url: &str,
        target_name: &str,
        size_limit: u64,
        on_progress: Option<&ProgressFn>,
    ) -> Result<DownloadResult, FetchError>;

    /// Drop a delivered file if cleanup is enabled
    async fn release(&self, result: &DownloadResult);

    /// Remove every regular file in the download directory; returns the count
    async fn cleanup_all(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_percent() {
        assert_eq!(Progress::new(50, 200).percent, 25.0);
        assert_eq!(Progress::new(0, 0).percent, 0.0);
        assert_eq!(Progress::new(300, 200).percent, 100.0);
    }
}
