//! Inbound update routing
//!
//! Every webhook update goes through the [`Dispatcher`]:
//!
//! - updates without a message, from bots, or without a sender are ignored
//! - `/start`, `/help` and `/stats` run their [`CommandHandler`]
//! - anything else is handed to the [`Pipeline`](crate::pipeline::Pipeline)
//!   together with a fresh status message

mod commands;
mod dispatcher;
mod registry;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::{HELP_TEXT, HelpCommand, StartCommand, StatsCommand};
pub use dispatcher::{Dispatcher, HANDLER_ERROR_TEXT};
pub use registry::CommandRegistry;
pub use traits::{CommandHandler, HandlerError};
pub use types::{CommandContext, DispatchOutcome, IgnoreReason};
