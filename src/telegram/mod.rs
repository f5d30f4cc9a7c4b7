//! Telegram Bot API surface: inbound update types, an outbound client and
//! file delivery with video-to-document fallback

mod client;
mod error;
mod types;

use std::path::Path;

use async_trait::async_trait;
use tracing::{debug, warn};

pub use client::{BotApi, MAX_CAPTION_LEN, MAX_MESSAGE_LEN};
pub use error::{DeliveryError, TelegramError};
pub use types::{ApiResponse, Chat, Message, SentMessage, Update, User};

/// Outbound chat operations the bot depends on
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Returns the new message id
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TelegramError>;

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), TelegramError>;

    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), TelegramError>;

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), TelegramError>;
}

/// How a file ended up in the chat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMethod {
    Video,
    Document,
}

/// Upload `path` as a streamable video; when that fails and `fallback` is
/// set, retry once as a plain document
pub async fn deliver_file(
    chat: &dyn ChatApi,
    chat_id: i64,
    path: &Path,
    caption: &str,
    fallback: bool,
) -> Result<DeliveryMethod, DeliveryError> {
    let video = match chat.send_video(chat_id, path, caption).await {
        Ok(()) => {
            debug!(chat_id, path = %path.display(), "delivered as video");
            return Ok(DeliveryMethod::Video);
        }
        Err(e) => e,
    };

    if !fallback {
        return Err(DeliveryError::PrimaryFailed(video));
    }

    warn!(chat_id, error = %video, "video upload failed, sending as document");
    match chat.send_document(chat_id, path, caption).await {
        Ok(()) => Ok(DeliveryMethod::Document),
        Err(document) => Err(DeliveryError::AllFailed { video, document }),
    }
}
