use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Semaphore;
use url::Url;

use super::types::{ApiResponse, EditMessageText, Message, SendMessage, PARSE_MODE};
use crate::auth::Token;
use crate::error::{RelayError, Result};
use crate::notifier::Notifier;
use crate::state::MessageHandle;

const MAX_CONCURRENT_REQUESTS: usize = 16;
const NOT_MODIFIED: &str = "message is not modified";

/// Telegram Bot API client bound to a single destination chat.
pub struct TelegramClient {
    client: Client,
    bot_url: Url,
    chat_id: String,
    semaphore: Arc<Semaphore>,
}

impl TelegramClient {
    /// Creates a client for `chat_id` authenticated with the bot `token`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - Bot API base URL (e.g., <https://api.telegram.org>)
    /// * `token` - Bot token issued by @BotFather
    /// * `chat_id` - Numeric chat id or `@channel` username
    /// * `timeout` - Upper bound for every request, connect included
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the URL is invalid.
    pub fn new(base_url: &str, token: &Token, chat_id: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("cinotify/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::Config(format!("Failed to create HTTP client: {e}")))?;

        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        // "./" keeps the colon inside the token from being read as a URL scheme.
        let bot_url = Url::parse(&base)
            .map_err(|e| RelayError::Config(format!("Invalid base URL: {e}")))?
            .join(&format!("./bot{}/", token.as_str()))
            .map_err(|e| RelayError::Config(format!("Invalid bot URL: {e}")))?;

        Ok(Self {
            client,
            bot_url,
            chat_id,
            semaphore: Arc::new(Semaphore::new(MAX_CONCURRENT_REQUESTS)),
        })
    }

    /// Calls a Bot API method and unwraps its `result`.
    async fn call<T>(&self, method: &str, body: &impl Serialize) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|e| RelayError::Config(format!("Request limiter closed: {e}")))?;

        let url = self
            .bot_url
            .join(method)
            .map_err(|e| RelayError::Config(format!("Invalid method URL: {e}")))?;

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let envelope: ApiResponse<T> = match serde_json::from_str(&text) {
            Ok(envelope) => envelope,
            Err(_) if !status.is_success() => {
                return Err(RelayError::Api {
                    status: status.as_u16(),
                    message: text,
                });
            }
            Err(e) => return Err(e.into()),
        };

        match envelope {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(RelayError::Api {
                status: status.as_u16(),
                message: description.unwrap_or_else(|| "Empty response".to_string()),
            }),
        }
    }

    pub async fn send_message(&self, text: &str) -> Result<MessageHandle> {
        let body = SendMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode: PARSE_MODE,
            disable_web_page_preview: true,
        };
        let message: Message = self.call("sendMessage", &body).await?;
        Ok(MessageHandle::new(message.message_id))
    }

    pub async fn edit_message_text(&self, handle: MessageHandle, text: &str) -> Result<()> {
        let body = EditMessageText {
            chat_id: &self.chat_id,
            message_id: handle.as_i64(),
            text,
            parse_mode: PARSE_MODE,
            disable_web_page_preview: true,
        };
        // The result is either the edited message or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &body).await?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn send(&self, text: &str) -> Result<MessageHandle> {
        self.send_message(text).await.map_err(|e| {
            error!("Failed to send message to chat {}: {e}", self.chat_id);
            RelayError::SendFailed(e.to_string())
        })
    }

    async fn update(&self, handle: MessageHandle, text: &str) -> Result<()> {
        match self.edit_message_text(handle, text).await {
            Ok(()) => Ok(()),
            Err(RelayError::Api { message, .. }) if message.contains(NOT_MODIFIED) => {
                debug!("Message {handle} already up to date");
                Ok(())
            }
            Err(e) => {
                error!("Failed to update message {handle} in chat {}: {e}", self.chat_id);
                Err(RelayError::UpdateFailed(e.to_string()))
            }
        }
    }
}
