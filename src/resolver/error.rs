use thiserror::Error;

/// Terminal resolve outcomes surfaced to the pipeline
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("resolver rejected link: {0}")]
    Rejected(String),

    #[error("resolver failed after {attempts} attempts: {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("malformed resolver response: {0}")]
    Malformed(String),

    #[error("resolver returned no download URL")]
    MissingDownloadUrl,

    #[error("resolver client setup failed: {0}")]
    Client(String),
}

impl ResolveError {
    /// Short label used in operator reports
    pub fn category(&self) -> &'static str {
        match self {
            ResolveError::Rejected(_) => "Resolution Failed",
            ResolveError::Exhausted { .. } => "Resolver Unreachable",
            ResolveError::Malformed(_) => "Malformed Response",
            ResolveError::MissingDownloadUrl => "No Download URL",
            ResolveError::Client(_) => "Resolver Misconfigured",
        }
    }
}

/// Failure of a single resolver request; some kinds are worth retrying
#[derive(Debug, Error)]
pub(crate) enum AttemptError {
    #[error("rate limited (HTTP 429)")]
    RateLimited,

    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("{0}")]
    Malformed(String),

    #[error("status '{status}', has link: {has_link}")]
    Rejected { status: String, has_link: bool },
}

impl AttemptError {
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(
            self,
            AttemptError::RateLimited | AttemptError::Timeout | AttemptError::Transport(_)
        )
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptError::Timeout
        } else {
            AttemptError::Transport(err.to_string())
        }
    }
}

impl From<AttemptError> for ResolveError {
    fn from(err: AttemptError) -> Self {
        match err {
            AttemptError::Malformed(msg) => ResolveError::Malformed(msg),
            other => ResolveError::Rejected(other.to_string()),
        }
    }
}
