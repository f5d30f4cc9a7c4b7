use crate::pipeline::BatchSummary;
use crate::store::UserProfile;
use crate::telegram::Message;

/// What a command handler gets to work with
#[derive(Debug, Clone)]
pub struct CommandContext<'a> {
    pub message: &'a Message,
    pub user: UserProfile,
    pub chat_id: i64,
}

/// Why an update was not acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoMessage,
    FromBot,
    NoSender,
}

/// How the dispatcher handled one update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Ignored(IgnoreReason),
    Command(String),
    Batch(BatchSummary),
}
