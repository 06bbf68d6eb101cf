//! Telegram Bot API messenger
//!
//! Thin JSON-over-HTTPS client for the handful of Bot API methods the bot uses.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::{InlineKeyboard, Messenger, MessengerError, MessengerResult};

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    result: Value,
    error_code: Option<u16>,
    description: Option<String>,
}

/// Messenger backed by the Telegram Bot API
#[derive(Clone)]
pub struct TelegramMessenger {
    client: reqwest::Client,
    api_base: String,
    token: String,
}

impl std::fmt::Debug for TelegramMessenger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramMessenger")
            .field("api_base", &self.api_base)
            .field("token", &"***")
            .finish()
    }
}

impl TelegramMessenger {
    /// Create a client for the public Bot API
    pub fn new(token: impl Into<String>, timeout: Duration) -> Result<Self, MessengerError> {
        Self::with_api_base(token, DEFAULT_API_BASE, timeout)
    }

    /// Create a client against a custom API base (local Bot API server, tests)
    pub fn with_api_base(
        token: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, MessengerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MessengerError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Points Telegram at our webhook endpoint
    pub async fn set_webhook(&self, url: &str) -> MessengerResult<()> {
        self.call("setWebhook", None, json!({ "url": url })).await?;
        info!("Webhook registered");
        Ok(())
    }

    /// Handle of the bot itself, without the leading `@`
    pub async fn get_me(&self) -> MessengerResult<Option<String>> {
        let me = self.call_for_result("getMe", None, json!({})).await?;
        Ok(me.get("username").and_then(Value::as_str).map(str::to_string))
    }

    async fn call(&self, method: &str, recipient: Option<&str>, body: Value) -> MessengerResult<()> {
        self.call_for_result(method, recipient, body).await.map(|_| ())
    }

    async fn call_for_result(&self, method: &str, recipient: Option<&str>, body: Value) -> MessengerResult<Value> {
        let url = format!("{}/bot{}/{}", self.api_base, self.token, method);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| MessengerError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();
        let parsed: ApiResponse = response
            .json()
            .await
            .map_err(|e| MessengerError::Transport(e.without_url().to_string()))?;

        if parsed.ok {
            debug!(method = %method, "Bot API call succeeded");
            return Ok(parsed.result);
        }

        let code = parsed.error_code.unwrap_or(status);
        let description = parsed.description.unwrap_or_else(|| "unknown error".to_string());
        Err(classify_failure(code, description, recipient))
    }

    async fn send_media(
        &self,
        method: &str,
        field: &str,
        recipient: &str,
        file: &str,
        caption: &str,
    ) -> MessengerResult<()> {
        let mut body = json!({
            "chat_id": recipient,
            "caption": caption,
            "parse_mode": "HTML",
        });
        body[field] = Value::String(file.to_string());
        self.call(method, Some(recipient), body).await
    }
}

/// Blocked bots, deactivated accounts and unknown chats are the recipient's
/// problem, not the transport's
fn classify_failure(code: u16, description: String, recipient: Option<&str>) -> MessengerError {
    let lowered = description.to_lowercase();
    let unreachable = code == 403
        || (code == 400 && (lowered.contains("chat not found") || lowered.contains("user is deactivated")));

    match recipient {
        Some(recipient) if unreachable => MessengerError::RecipientUnreachable {
            recipient: recipient.to_string(),
            reason: description,
        },
        _ => MessengerError::Api { code, description },
    }
}

#[async_trait]
impl Messenger for TelegramMessenger {
    async fn send_text(&self, recipient: &str, text: &str) -> MessengerResult<()> {
        let body = json!({
            "chat_id": recipient,
            "text": text,
            "parse_mode": "HTML",
        });
        self.call("sendMessage", Some(recipient), body).await
    }

    async fn send_text_with_keyboard(
        &self,
        recipient: &str,
        text: &str,
        keyboard: &InlineKeyboard,
    ) -> MessengerResult<()> {
        let body = json!({
            "chat_id": recipient,
            "text": text,
            "parse_mode": "HTML",
            "reply_markup": keyboard,
        });
        self.call("sendMessage", Some(recipient), body).await
    }

    async fn send_photo(&self, recipient: &str, image: &str, caption: &str) -> MessengerResult<()> {
        self.send_media("sendPhoto", "photo", recipient, image, caption).await
    }

    async fn send_video(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()> {
        self.send_media("sendVideo", "video", recipient, file, caption).await
    }

    async fn send_audio(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()> {
        self.send_media("sendAudio", "audio", recipient, file, caption).await
    }

    async fn send_document(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()> {
        self.send_media("sendDocument", "document", recipient, file, caption).await
    }

    async fn delete_message(&self, conversation: &str, message_id: i64) -> MessengerResult<()> {
        let body = json!({ "chat_id": conversation, "message_id": message_id });
        self.call("deleteMessage", Some(conversation), body).await
    }

    async fn acknowledge(&self, callback_id: &str) -> MessengerResult<()> {
        let body = json!({ "callback_query_id": callback_id });
        self.call("answerCallbackQuery", None, body).await
    }
}
