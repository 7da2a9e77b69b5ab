//! Telegram messaging channel
//!
//! Implements the Messenger trait over the Telegram Bot API: `sendMessage`
//! for outbound alerts and `getUpdates` long-polling for inbound operator
//! commands. Only messages from the configured operator chat are surfaced;
//! everything else is skipped while still advancing the update offset.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::constants;
use crate::error::AppError;
use crate::messaging::errors::{MessagingError, MessagingResult};
use crate::messaging::traits::{InboundMessage, Messenger, UpdateBatch};

/// Telegram Bot API host
const TELEGRAM_API_BASE: &str = "https://api.telegram.org";

// =============================================================================
// Configuration
// =============================================================================

/// Telegram credentials and destination, loaded once at startup
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token issued by BotFather
    pub token: String,
    /// Operator chat receiving alerts and issuing commands
    pub chat_id: i64,
}

impl TelegramConfig {
    /// Create configuration from environment variables.
    ///
    /// Both `TELEGRAM_TOKEN` and `CHAT_ID` are required; the bot refuses to
    /// start without them.
    pub fn from_env() -> Result<Self, AppError> {
        let token = std::env::var("TELEGRAM_TOKEN")
            .map_err(|_| AppError::Config("TELEGRAM_TOKEN must be set in .env".to_string()))?;
        let chat_id = std::env::var("CHAT_ID")
            .map_err(|_| AppError::Config("CHAT_ID must be set in .env".to_string()))?
            .parse::<i64>()
            .map_err(|_| AppError::Config("CHAT_ID must be a numeric chat id".to_string()))?;

        Ok(Self { token, chat_id })
    }
}

// =============================================================================
// API Types
// =============================================================================

#[derive(Debug, Serialize)]
struct SendMessageBody<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<UpdateMessage>,
}

#[derive(Debug, Deserialize)]
struct UpdateMessage {
    chat: Chat,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

// =============================================================================
// Channel
// =============================================================================

/// Telegram-backed messaging channel
pub struct TelegramChannel {
    client: reqwest::Client,
    base_url: String,
    config: TelegramConfig,
    poll_timeout_secs: u64,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        let poll_timeout_secs = constants::command_poll_timeout_secs();
        // The HTTP timeout must outlast the server-side long poll
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(poll_timeout_secs + 10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: TELEGRAM_API_BASE.to_string(),
            config,
            poll_timeout_secs,
        }
    }

    /// Override the API base URL (used by tests against a mock server)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base_url, self.config.token, method)
    }

    fn check<T>(response: ApiResponse<T>) -> MessagingResult<T> {
        if !response.ok {
            return Err(MessagingError::Api(
                response
                    .description
                    .unwrap_or_else(|| "request rejected without description".to_string()),
            ));
        }
        response
            .result
            .ok_or_else(|| MessagingError::Api("ok response carried no result".to_string()))
    }
}

#[async_trait]
impl Messenger for TelegramChannel {
    async fn send_message(&self, text: &str) -> MessagingResult<()> {
        let body = SendMessageBody {
            chat_id: self.config.chat_id,
            text,
        };

        let response = self
            .client
            .post(self.method_url("sendMessage"))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(MessagingError::Api(format!("sendMessage {}: {}", status, body)));
        }

        let parsed: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| MessagingError::Api(format!("sendMessage decode: {}", e)))?;
        Self::check(parsed)?;
        Ok(())
    }

    async fn poll_updates(&self, offset: i64) -> MessagingResult<UpdateBatch> {
        let response = self
            .client
            .get(self.method_url("getUpdates"))
            .query(&[("offset", offset), ("timeout", self.poll_timeout_secs as i64)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(MessagingError::Api(format!("getUpdates {}: {}", status, body)));
        }

        let parsed: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| MessagingError::Api(format!("getUpdates decode: {}", e)))?;
        let updates = Self::check(parsed)?;

        let mut batch = UpdateBatch {
            messages: Vec::new(),
            next_offset: offset,
        };
        for update in updates {
            batch.next_offset = batch.next_offset.max(update.update_id + 1);
            let Some(message) = update.message else { continue };
            let Some(text) = message.text else { continue };
            if message.chat.id != self.config.chat_id {
                debug!(chat_id = message.chat.id, "ignoring message from foreign chat");
                continue;
            }
            batch.messages.push(InboundMessage {
                update_id: update.update_id,
                chat_id: message.chat.id,
                text,
            });
        }
        Ok(batch)
    }
}

// ============================================================================
// Tests
// ============================================================================
