use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;

use crate::telegram::{ChatApi, TelegramError};

/// Chat API double that records text messages and edits
#[derive(Default)]
pub struct RecordingChat {
    pub fail_messages: bool,
    pub next_id: AtomicI64,
    pub messages: Mutex<Vec<(i64, String)>>,
    pub edits: Mutex<Vec<(i64, i64, String)>>,
    pub uploads: Mutex<Vec<(i64, String)>>,
}

impl RecordingChat {
    pub fn sent(&self) -> Vec<(i64, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<(i64, i64, String)> {
        self.edits.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(i64, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for RecordingChat {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TelegramError> {
        self.messages.lock().unwrap().push((chat_id, text.to_string()));
        if self.fail_messages {
            return Err(TelegramError::Api {
                code: 403,
                description: "Forbidden: bot was blocked by the user".to_string(),
            });
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), TelegramError> {
        self.edits
            .lock()
            .unwrap()
            .push((chat_id, message_id, text.to_string()));
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, _: &Path, caption: &str) -> Result<(), TelegramError> {
        self.uploads.lock().unwrap().push((chat_id, caption.to_string()));
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, _: &Path, caption: &str) -> Result<(), TelegramError> {
        self.uploads.lock().unwrap().push((chat_id, caption.to_string()));
        Ok(())
    }
}

/// Resolver that refuses every link
pub struct RejectingResolver;

#[async_trait]
impl crate::resolver::LinkResolver for RejectingResolver {
    async fn resolve(&self, _: &str) -> Result<crate::resolver::FileDescriptor, crate::resolver::ResolveError> {
        Err(crate::resolver::ResolveError::Rejected("status 'error', has link: false".to_string()))
    }
}

/// Fetcher that never gets a file
pub struct UnreachableFetcher;

#[async_trait]
impl crate::fetcher::Fetcher for UnreachableFetcher {
    async fn fetch(
        &self,
        _: &str,
        _: &str,
        _: u64,
        _: Option<&crate::fetcher::ProgressFn>,
    ) -> Result<crate::fetcher::DownloadResult, crate::fetcher::FetchError> {
        Err(crate::fetcher::FetchError::Transport("offline".to_string()))
    }

    async fn release(&self, _: &crate::fetcher::DownloadResult) {}

    async fn cleanup_all(&self) -> usize {
        0
    }
}
