//! Bot API objects, reduced to the fields the bot reads

use serde::{Deserialize, Serialize};

use crate::store::UserProfile;

/// Telegram Update object
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    /// New incoming message; other update kinds are ignored
    #[serde(default)]
    pub message: Option<Message>,
}

impl Update {
    pub fn message(&self) -> Option<&Message> {
        self.message.as_ref()
    }
}

/// Telegram Message object
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    /// Text attached to media messages
    #[serde(default)]
    pub caption: Option<String>,
}

impl Message {
    /// Text if present, otherwise the media caption
    pub fn content(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }

    /// Command name when the text starts with `/`, stripped of any
    /// `@botname` suffix and lowercased
    pub fn command(&self) -> Option<String> {
        let text = self.text.as_deref()?.trim_start();
        let word = text.strip_prefix('/')?.split_whitespace().next()?;
        let name = word.split('@').next().unwrap_or(word);
        (!name.is_empty()).then(|| name.to_lowercase())
    }

    pub fn from_bot(&self) -> bool {
        self.from.as_ref().is_some_and(|u| u.is_bot)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
    #[serde(rename = "type", default)]
    pub chat_type: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        let first_name = if user.first_name.trim().is_empty() {
            "User".to_string()
        } else {
            user.first_name.clone()
        };
        UserProfile {
            user_id: user.id,
            first_name,
            last_name: user.last_name.clone(),
            username: user.username.clone(),
        }
    }
}

/// Envelope every Bot API method returns
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub description: Option<String>,
}

/// Minimal view of a message returned by send/edit calls
#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct SendMessageRequest<'a> {
    pub chat_id: i64,
    pub text: &'a str,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct EditMessageTextRequest<'a> {
    pub chat_id: i64,
    pub message_id: i64,
    pub text: &'a str,
    pub disable_web_page_preview: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct SetWebhookRequest<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<&'a str>,
    pub allowed_updates: &'a [&'a str],
}
