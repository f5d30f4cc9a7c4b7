//! Bot API client over reqwest

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use super::ChatApi;
use super::error::TelegramError;
use super::types::{
    ApiResponse, EditMessageTextRequest, SendMessageRequest, SentMessage, SetWebhookRequest,
};
use crate::config::TelegramConfig;

/// Telegram rejects longer message texts
pub const MAX_MESSAGE_LEN: usize = 4096;
/// ... and longer media captions
pub const MAX_CAPTION_LEN: usize = 1024;

/// Long-lived Bot API client bound to one bot token
#[derive(Clone)]
pub struct BotApi {
    client: Client,
    base: String,
}

impl std::fmt::Debug for BotApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotApi").finish_non_exhaustive()
    }
}

impl BotApi {
    pub fn new(config: &TelegramConfig, token: &str) -> Result<Self, TelegramError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(TelegramError::from_reqwest)?;

        Ok(Self {
            client,
            base: format!("{}/bot{}", config.api_base.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base, method)
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, TelegramError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(method, "calling Bot API");
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(TelegramError::from_reqwest)?;
        Self::unwrap_response(response).await
    }

    async fn upload(
        &self,
        method: &str,
        field: &'static str,
        chat_id: i64,
        path: &Path,
        caption: &str,
        extra: &[(&'static str, &'static str)],
    ) -> Result<SentMessage, TelegramError> {
        let io_err = |source| TelegramError::Io {
            path: path.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(path).await.map_err(io_err)?;
        let length = file.metadata().await.map_err(io_err)?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        let part = Part::stream_with_length(Body::from(file), length).file_name(file_name);
        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", truncate(caption, MAX_CAPTION_LEN))
            .part(field, part);
        for (key, value) in extra {
            form = form.text(*key, *value);
        }

        debug!(method, chat_id, bytes = length, "uploading file");
        let response = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await
            .map_err(TelegramError::from_reqwest)?;
        Self::unwrap_response(response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TelegramError> {
        let status = response.status();
        let bytes = response.bytes().await.map_err(TelegramError::from_reqwest)?;
        let parsed: ApiResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|e| TelegramError::Malformed(format!("HTTP {}: {}", status.as_u16(), e)))?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(TelegramError::Malformed("missing result".to_string())),
            (false, _) => Err(TelegramError::Api {
                code: parsed.error_code.unwrap_or(i64::from(status.as_u16())),
                description: parsed.description.unwrap_or_default(),
            }),
        }
    }

    /// Register `url` as the webhook endpoint
    pub async fn set_webhook(&self, url: &str, secret: Option<&str>) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "setWebhook",
                &SetWebhookRequest {
                    url,
                    secret_token: secret,
                    allowed_updates: &["message"],
                },
            )
            .await?;
        info!(url, "webhook registered");
        Ok(())
    }
}

#[async_trait]
impl ChatApi for BotApi {
    async fn send_message(&self, chat_id: i64, text: &str) -> Result<i64, TelegramError> {
        let text = truncate(text, MAX_MESSAGE_LEN);
        let sent: SentMessage = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id,
                    text: &text,
                    disable_web_page_preview: true,
                },
            )
            .await?;
        Ok(sent.message_id)
    }

    async fn edit_message(&self, chat_id: i64, message_id: i64, text: &str) -> Result<(), TelegramError> {
        let text = truncate(text, MAX_MESSAGE_LEN);
        // Returns the edited Message, or `true` for inline messages
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &EditMessageTextRequest {
                    chat_id,
                    message_id,
                    text: &text,
                    disable_web_page_preview: true,
                },
            )
            .await?;
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), TelegramError> {
        self.upload("sendVideo", "video", chat_id, path, caption, &[("supports_streaming", "true")])
            .await?;
        Ok(())
    }

    async fn send_document(&self, chat_id: i64, path: &Path, caption: &str) -> Result<(), TelegramError> {
        self.upload("sendDocument", "document", chat_id, path, caption, &[])
            .await?;
        Ok(())
    }
}

/// Cut `text` to at most `max` characters
pub(crate) fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
