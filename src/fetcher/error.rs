use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("file too large: {size} bytes exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("download timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {0}")]
    HttpStatus(u16),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_redirect() {
            FetchError::Transport("too many redirects".to_string())
        } else {
            FetchError::Transport(err.to_string())
        }
    }

    /// Short label used in operator reports
    pub fn category(&self) -> &'static str {
        match self {
            FetchError::TooLarge { .. } => "File Too Large",
            FetchError::Transport(_) => "Download Failed",
            FetchError::Timeout(_) => "Download Timeout",
            FetchError::HttpStatus(_) => "Download Rejected",
            FetchError::Io { .. } => "Storage Error",
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;
