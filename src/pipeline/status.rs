//! Single editable status message per batch

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use crate::telegram::ChatApi;

/// Receives human-readable progress for one batch
#[async_trait]
pub trait ProgressSink: Send + Sync {
    async fn update(&self, text: &str);
}

#[derive(Debug, Default)]
struct State {
    message_id: Option<i64>,
    last_text: String,
}

/// Sends the first update as a new message and edits it afterwards.
/// Chat API failures are logged and otherwise ignored.
pub struct StatusMessage {
    chat: Arc<dyn ChatApi>,
    chat_id: i64,
    state: Mutex<State>,
}

impl StatusMessage {
    pub fn new(chat: Arc<dyn ChatApi>, chat_id: i64) -> Self {
        Self {
            chat,
            chat_id,
            state: Mutex::new(State::default()),
        }
    }

    pub async fn message_id(&self) -> Option<i64> {
        self.state.lock().await.message_id
    }
}

#[async_trait]
impl ProgressSink for StatusMessage {
    async fn update(&self, text: &str) {
        let mut state = self.state.lock().await;
        // Telegram rejects edits that do not change the text
        if state.last_text == text {
            return;
        }

        let current = state.message_id;
        let result = match current {
            Some(id) => self.chat.edit_message(self.chat_id, id, text).await,
            None => self
                .chat
                .send_message(self.chat_id, text)
                .await
                .map(|id| state.message_id = Some(id)),
        };

        match result {
            Ok(()) => state.last_text = text.to_string(),
            Err(e) => debug!(chat_id = self.chat_id, error = %e, "status update failed"),
        }
    }
}
