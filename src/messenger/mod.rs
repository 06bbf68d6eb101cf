//! Outbound messaging
//!
//! The [`Messenger`] trait is the only way the bot talks to recipients. All
//! operations report failures to the caller; none of them is fatal.

pub mod recording;
pub mod telegram;

use async_trait::async_trait;
use serde::Serialize;

use crate::models::CallbackIntent;

pub use recording::{RecordingMessenger, SentMessage};
pub use telegram::TelegramMessenger;

/// Errors that can occur while delivering to one recipient
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessengerError {
    #[error("Recipient {recipient} unreachable: {reason}")]
    RecipientUnreachable { recipient: String, reason: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("API error {code}: {description}")]
    Api { code: u16, description: String },
}

pub type MessengerResult<T> = Result<T, MessengerError>;

/// One button of an inline keyboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, intent: &CallbackIntent) -> Self {
        Self {
            text: text.into(),
            callback_data: intent.to_string(),
        }
    }
}

/// Rows of inline buttons attached to a message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row(mut self, buttons: Vec<InlineButton>) -> Self {
        self.inline_keyboard.push(buttons);
        self
    }

    /// Lays buttons out left to right, `columns` per row
    pub fn grid(buttons: Vec<InlineButton>, columns: usize) -> Self {
        let columns = columns.max(1);
        let mut keyboard = Self::new();
        let mut row = Vec::with_capacity(columns);
        for button in buttons {
            row.push(button);
            if row.len() == columns {
                keyboard.inline_keyboard.push(std::mem::take(&mut row));
            }
        }
        if !row.is_empty() {
            keyboard.inline_keyboard.push(row);
        }
        keyboard
    }

    pub fn buttons(&self) -> impl Iterator<Item = &InlineButton> {
        self.inline_keyboard.iter().flatten()
    }
}

/// Delivery primitives. Text and captions are HTML markup.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(&self, recipient: &str, text: &str) -> MessengerResult<()>;

    async fn send_text_with_keyboard(
        &self,
        recipient: &str,
        text: &str,
        keyboard: &InlineKeyboard,
    ) -> MessengerResult<()>;

    async fn send_photo(&self, recipient: &str, image: &str, caption: &str) -> MessengerResult<()>;

    async fn send_video(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()>;

    async fn send_audio(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()>;

    async fn send_document(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()>;

    async fn delete_message(&self, conversation: &str, message_id: i64) -> MessengerResult<()>;

    /// Answers a button press so the client stops its loading indicator
    async fn acknowledge(&self, callback_id: &str) -> MessengerResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_layout() {
        let buttons: Vec<InlineButton> = (0..5)
            .map(|i| InlineButton::new(format!("b{i}"), &CallbackIntent::SelectRegion(i.to_string())))
            .collect();

        let keyboard = InlineKeyboard::grid(buttons, 2);

        assert_eq!(keyboard.inline_keyboard.len(), 3);
        assert_eq!(keyboard.inline_keyboard[2].len(), 1);
        assert_eq!(keyboard.inline_keyboard[0][1].callback_data, "region_1");
    }

    #[test]
    fn test_keyboard_serializes_as_reply_markup() {
        let keyboard = InlineKeyboard::new().row(vec![InlineButton::new("Go", &CallbackIntent::Library)]);
        let value = serde_json::to_value(&keyboard).unwrap();
        assert_eq!(value["inline_keyboard"][0][0]["callback_data"], "library");
    }
}
