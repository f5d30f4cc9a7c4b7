//! Built-in `/start`, `/help` and `/stats`

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::info;

use super::traits::{CommandHandler, HandlerError};
use super::types::CommandContext;
use crate::humanize::format_size;
use crate::store::UserStore;
use crate::telegram::ChatApi;

fn format_time(time: DateTime<Utc>) -> String {
    time.format("%Y-%m-%d %H:%M UTC").to_string()
}

/// Greets the user and makes sure their record exists
pub struct StartCommand {
    chat: Arc<dyn ChatApi>,
    store: Arc<dyn UserStore>,
}

impl StartCommand {
    pub fn new(chat: Arc<dyn ChatApi>, store: Arc<dyn UserStore>) -> Self {
        Self { chat, store }
    }
}

#[async_trait]
impl CommandHandler for StartCommand {
    fn description(&self) -> &'static str {
        "Show the welcome message"
    }

    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<(), HandlerError> {
        let (_, created) = self.store.ensure_user(&ctx.user)?;
        info!(user_id = ctx.user.user_id, created, "start command");

        let text = format!(
            "🎉 Welcome to TeraBox Downloader Bot!\n\n\
             Hi {}! 👋\n\n\
             Send me one or more TeraBox share links and I will download the \
             files and send them back to you.\n\n\
             🔗 Supported links:\n\
             • https://terabox.com/s/xxxxx\n\
             • https://1024terabox.com/s/xxxxx\n\
             • https://freeterabox.com/s/xxxxx\n\
             • Other TeraBox mirrors\n\n\
             ⚙️ Commands:\n\
             /start - Show this message\n\
             /help - Get detailed help\n\
             /stats - View your statistics",
            ctx.user.first_name
        );
        self.chat.send_message(ctx.chat_id, &text).await?;
        Ok(())
    }
}

pub const HELP_TEXT: &str = "📚 Help\n\n\
    Basic usage:\n\
    1. Send any TeraBox link\n\
    2. The bot resolves and downloads the file\n\
    3. The file is uploaded back to this chat\n\n\
    Links are picked up from plain text and from captions on photos, videos \
    and forwarded messages. Send several links in one message, separated by \
    spaces or newlines, and each one is processed in turn.\n\n\
    Commands:\n\
    /start - Welcome message\n\
    /help - This help message\n\
    /stats - Your usage statistics\n\n\
    Troubleshooting:\n\
    • Link rejected? Check that it is a valid share link\n\
    • Download failed? Try again in a few minutes\n\
    • Very large files may exceed the upload limit";

pub struct HelpCommand {
    chat: Arc<dyn ChatApi>,
}

impl HelpCommand {
    pub fn new(chat: Arc<dyn ChatApi>) -> Self {
        Self { chat }
    }
}

#[async_trait]
impl CommandHandler for HelpCommand {
    fn description(&self) -> &'static str {
        "Explain how to use the bot"
    }

    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<(), HandlerError> {
        self.chat.send_message(ctx.chat_id, HELP_TEXT).await?;
        Ok(())
    }
}

/// Shows the caller's usage counters
pub struct StatsCommand {
    chat: Arc<dyn ChatApi>,
    store: Arc<dyn UserStore>,
}

impl StatsCommand {
    pub fn new(chat: Arc<dyn ChatApi>, store: Arc<dyn UserStore>) -> Self {
        Self { chat, store }
    }
}

#[async_trait]
impl CommandHandler for StatsCommand {
    fn description(&self) -> &'static str {
        "Show your usage statistics"
    }

    async fn handle(&self, ctx: &CommandContext<'_>) -> Result<(), HandlerError> {
        let text = match self.store.user_stats(ctx.user.user_id)? {
            None => "📊 Your Statistics\n\nNo downloads yet. Send a TeraBox link to get started!"
                .to_string(),
            Some(stats) => format!(
                "📊 Your Statistics\n\n\
                 👤 User ID: {}\n\
                 🔁 Total Requests: {}\n\
                 🔗 Links Processed: {}\n\
                 📥 Files in History: {}\n\
                 💾 Total Size Downloaded: {}\n\
                 📅 First Seen: {}\n\
                 ⏰ Last Active: {}",
                ctx.user.user_id,
                stats.total_requests,
                stats.links_processed,
                stats.downloaded_count,
                format_size(stats.downloaded_bytes),
                format_time(stats.first_seen),
                format_time(stats.last_active),
            ),
        };

        self.chat.send_message(ctx.chat_id, &text).await?;
        Ok(())
    }
}
