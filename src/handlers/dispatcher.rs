use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use super::registry::CommandRegistry;
use super::types::{CommandContext, DispatchOutcome, IgnoreReason};
use crate::pipeline::{Pipeline, StatusMessage};
use crate::store::{UserProfile, UserStore};
use crate::telegram::{ChatApi, Update};

pub const HANDLER_ERROR_TEXT: &str = "❌ An error occurred. Please try again.";

/// Routes one inbound update to a command handler or the pipeline
pub struct Dispatcher {
    registry: CommandRegistry,
    pipeline: Arc<Pipeline>,
    chat: Arc<dyn ChatApi>,
    store: Arc<dyn UserStore>,
}

impl Dispatcher {
    pub fn new(
        registry: CommandRegistry,
        pipeline: Arc<Pipeline>,
        chat: Arc<dyn ChatApi>,
        store: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            chat,
            store,
        }
    }

    pub fn pipeline(&self) -> &Arc<Pipeline> {
        &self.pipeline
    }

    #[instrument(skip_all, fields(update_id = update.update_id))]
    pub async fn dispatch(&self, update: &Update) -> DispatchOutcome {
        let Some(message) = update.message() else {
            debug!("update carries no message");
            return DispatchOutcome::Ignored(IgnoreReason::NoMessage);
        };
        if message.from_bot() {
            debug!("ignoring message from bot");
            return DispatchOutcome::Ignored(IgnoreReason::FromBot);
        }
        let Some(sender) = message.from.as_ref() else {
            debug!("message without sender");
            return DispatchOutcome::Ignored(IgnoreReason::NoSender);
        };

        let user = UserProfile::from(sender);
        let chat_id = message.chat.id;

        if let Some(name) = message.command() {
            if let Some(handler) = self.registry.get(&name) {
                info!(user_id = user.user_id, command = %name, "handling command");
                if let Err(e) = self.store.touch(user.user_id) {
                    debug!(error = %e, "touch skipped");
                }
                let ctx = CommandContext {
                    message,
                    user,
                    chat_id,
                };
                if let Err(e) = handler.handle(&ctx).await {
                    warn!(command = %name, error = %e, "command failed");
                    if let Err(e) = self.chat.send_message(chat_id, HANDLER_ERROR_TEXT).await {
                        warn!(error = %e, "failed to send error reply");
                    }
                }
                return DispatchOutcome::Command(name);
            }
            debug!(command = %name, "unknown command, treating as text");
        }

        let status = StatusMessage::new(self.chat.clone(), chat_id);
        let summary = self
            .pipeline
            .process(message.content(), &user, chat_id, &status)
            .await;
        DispatchOutcome::Batch(summary)
    }
}
