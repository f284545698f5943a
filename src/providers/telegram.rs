/*!
 * Minimal Telegram Bot API client.
 *
 * Covers what the presentation layer needs: long polling for updates,
 * sending messages with inline keyboards, replacing a message's keyboard
 * and acknowledging callback queries.
 */

use std::time::Duration;

use log::error;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{ErrorDetail, ProviderError};

/// Longest text accepted by `sendMessage`
pub const MAX_MESSAGE_CHARS: usize = 4096;

/// Incoming update
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

/// Chat message
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// Button press on an inline keyboard
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// Inline keyboard, one inner vector per row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct EditReplyMarkupRequest<'a> {
    chat_id: i64,
    message_id: i64,
    reply_markup: &'a InlineKeyboardMarkup,
}

#[derive(Serialize)]
struct AnswerCallbackRequest<'a> {
    callback_query_id: &'a str,
}

/// Telegram Bot API client
pub struct TelegramClient {
    /// HTTP client for API requests
    client: Client,
    /// `{api_url}/bot{token}`
    base_url: String,
    poll_timeout_secs: u64,
}

impl TelegramClient {
    /// Create a new client
    pub fn new(api_url: &str, token: &str, poll_timeout_secs: u64) -> Self {
        Self {
            client: Client::builder()
                // long polls must outlive the server-side timeout
                .timeout(Duration::from_secs(poll_timeout_secs + 10))
                .build()
                .unwrap_or_default(),
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
            poll_timeout_secs,
        }
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, ProviderError> {
        let request = GetUpdatesRequest {
            offset,
            timeout: self.poll_timeout_secs,
            allowed_updates: ["message", "callback_query"],
        };
        self.call("getUpdates", &request).await
    }

    /// Send a text message, optionally with an inline keyboard
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, ProviderError> {
        let text = truncate_message(text);
        let request = SendMessageRequest {
            chat_id,
            text: &text,
            reply_markup,
        };
        self.call("sendMessage", &request).await
    }

    /// Replace the inline keyboard of a sent message
    pub async fn edit_message_reply_markup(
        &self,
        chat_id: i64,
        message_id: i64,
        reply_markup: &InlineKeyboardMarkup,
    ) -> Result<(), ProviderError> {
        let request = EditReplyMarkupRequest {
            chat_id,
            message_id,
            reply_markup,
        };
        // the result is either the edited message or `true`
        self.call::<_, serde_json::Value>("editMessageReplyMarkup", &request)
            .await
            .map(|_| ())
    }

    /// Acknowledge a callback query so the client stops its spinner
    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<(), ProviderError> {
        let request = AnswerCallbackRequest { callback_query_id };
        self.call::<_, bool>("answerCallbackQuery", &request).await.map(|_| ())
    }

    async fn call<B: Serialize, T: DeserializeOwned>(&self, method: &str, body: &B) -> Result<T, ProviderError> {
        let response = self
            .client
            .post(format!("{}/{}", self.base_url, method))
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let envelope = response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        match envelope {
            ApiResponse { ok: true, result: Some(result), .. } => Ok(result),
            ApiResponse { error_code, description, .. } => {
                let description = description.unwrap_or_else(|| "no description".to_string());
                error!("Telegram {} failed: {}", method, description);
                Err(ProviderError::Api {
                    status_code: error_code.unwrap_or(status.as_u16()),
                    details: vec![ErrorDetail::new(description, method)],
                })
            }
        }
    }
}

/// Cut a message to the length Telegram accepts
pub fn truncate_message(text: &str) -> String {
    if text.chars().count() <= MAX_MESSAGE_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_MESSAGE_CHARS - 1).collect();
    truncated.push('…');
    truncated
}
