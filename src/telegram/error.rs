use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("Bot API request failed: {0}")]
    Transport(String),

    #[error("Bot API request timed out")]
    Timeout,

    #[error("Bot API error {code}: {description}")]
    Api { code: i64, description: String },

    #[error("unexpected Bot API response: {0}")]
    Malformed(String),

    #[error("cannot read upload {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TelegramError {
    /// Bot token is part of every request URL; never let it reach a log line
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TelegramError::Timeout
        } else {
            TelegramError::Transport(err.without_url().to_string())
        }
    }
}

/// Uploading a file to a chat failed
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Video upload failed and no fallback was allowed
    #[error("video upload failed: {0}")]
    PrimaryFailed(#[source] TelegramError),

    #[error("video upload failed ({video}); document fallback failed ({document})")]
    AllFailed {
        video: TelegramError,
        document: TelegramError,
    },
}
