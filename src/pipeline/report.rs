//! Operator notifications for per-link failures

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::telegram::ChatApi;

/// One failed link, as shown to the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReport {
    pub link: String,
    pub user_name: String,
    /// Short label such as "Resolution Failed"
    pub category: String,
    pub detail: String,
    pub file_name: Option<String>,
}

impl FailureReport {
    pub fn render(&self) -> String {
        let mut text = format!("❌ {}\n\n", self.category);
        if let Some(name) = &self.file_name {
            text.push_str(&format!("File: {name}\n"));
        }
        text.push_str(&format!(
            "Link: {}\nUser: {}\nError: {}",
            self.link, self.user_name, self.detail
        ));
        text
    }
}

/// Receives failure reports. Implementations must not fail the caller.
#[async_trait]
pub trait FailureSink: Send + Sync {
    async fn report(&self, report: &FailureReport);
}

/// Posts reports to the configured error channel
pub struct ChannelReporter {
    chat: Arc<dyn ChatApi>,
    channel: i64,
}

impl ChannelReporter {
    pub fn new(chat: Arc<dyn ChatApi>, channel: i64) -> Self {
        Self { chat, channel }
    }
}

#[async_trait]
impl FailureSink for ChannelReporter {
    async fn report(&self, report: &FailureReport) {
        match self.chat.send_message(self.channel, &report.render()).await {
            Ok(_) => debug!(channel = self.channel, link = %report.link, "failure reported"),
            Err(e) => warn!(channel = self.channel, error = %e, "failed to send error report"),
        }
    }
}
