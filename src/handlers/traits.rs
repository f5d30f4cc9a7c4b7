use async_trait::async_trait;
use thiserror::Error;

use super::types::CommandContext;
use crate::store::StoreError;
use crate::telegram::TelegramError;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("chat API error: {0}")]
    Chat(#[from] TelegramError),
    #[error("user store error: {0}")]
    Store(#[from] StoreError),
}

/// A bot command such as `/start`
///
/// Handlers reply through the chat API themselves; an error makes the
/// dispatcher send a generic apology instead.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// One-line summary shown in `/help`
    fn description(&self) -> &'static str;

    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<(), HandlerError>;
}
