//! Recording messenger for deterministic testing
//!
//! Captures every delivery instead of sending it. Individual recipients can be
//! made to fail or to stall long enough to trip delivery timeouts.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{InlineKeyboard, Messenger, MessengerError, MessengerResult};

/// A captured outbound call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SentMessage {
    Text {
        recipient: String,
        text: String,
        keyboard: Option<InlineKeyboard>,
    },
    Photo { recipient: String, image: String, caption: String },
    Video { recipient: String, file: String, caption: String },
    Audio { recipient: String, file: String, caption: String },
    Document { recipient: String, file: String, caption: String },
    Deleted { conversation: String, message_id: i64 },
    Acknowledged { callback_id: String },
}

impl SentMessage {
    /// Recipient of a delivery; `None` for deletes and acknowledgements
    pub fn recipient(&self) -> Option<&str> {
        match self {
            SentMessage::Text { recipient, .. }
            | SentMessage::Photo { recipient, .. }
            | SentMessage::Video { recipient, .. }
            | SentMessage::Audio { recipient, .. }
            | SentMessage::Document { recipient, .. } => Some(recipient),
            SentMessage::Deleted { .. } | SentMessage::Acknowledged { .. } => None,
        }
    }

    /// Text body or caption of a delivery
    pub fn body(&self) -> Option<&str> {
        match self {
            SentMessage::Text { text, .. } => Some(text),
            SentMessage::Photo { caption, .. }
            | SentMessage::Video { caption, .. }
            | SentMessage::Audio { caption, .. }
            | SentMessage::Document { caption, .. } => Some(caption),
            SentMessage::Deleted { .. } | SentMessage::Acknowledged { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
struct RecordingState {
    sent: Vec<SentMessage>,
    attempts: Vec<String>,
    failing: HashSet<String>,
    stalls: HashMap<String, Duration>,
}

/// In-memory messenger that records instead of delivering
#[derive(Debug, Clone, Default)]
pub struct RecordingMessenger {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliveries to this recipient fail with `RecipientUnreachable`
    pub fn fail_for(&self, recipient: impl Into<String>) {
        if let Ok(mut state) = self.state.lock() {
            state.failing.insert(recipient.into());
        }
    }

    /// Deliveries to this recipient sleep for `delay` before completing
    pub fn stall_for(&self, recipient: impl Into<String>, delay: Duration) {
        if let Ok(mut state) = self.state.lock() {
            state.stalls.insert(recipient.into(), delay);
        }
    }

    /// Successful deliveries, in order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().map(|s| s.sent.clone()).unwrap_or_default()
    }

    /// Recipients of every attempted delivery, including failed ones
    pub fn attempts(&self) -> Vec<String> {
        self.state.lock().map(|s| s.attempts.clone()).unwrap_or_default()
    }

    /// Successful deliveries addressed to one recipient
    pub fn sent_to(&self, recipient: &str) -> Vec<SentMessage> {
        self.sent()
            .into_iter()
            .filter(|m| m.recipient() == Some(recipient))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.sent.clear();
            state.attempts.clear();
        }
    }

    async fn record(&self, recipient: Option<&str>, message: SentMessage) -> MessengerResult<()> {
        let delay = recipient.and_then(|r| self.state.lock().ok().and_then(|s| s.stalls.get(r).copied()));
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self
            .state
            .lock()
            .map_err(|_| MessengerError::Transport("recording state poisoned".to_string()))?;

        if let Some(recipient) = recipient {
            state.attempts.push(recipient.to_string());
            if state.failing.contains(recipient) {
                return Err(MessengerError::RecipientUnreachable {
                    recipient: recipient.to_string(),
                    reason: "Forbidden: bot was blocked by the user".to_string(),
                });
            }
        }

        state.sent.push(message);
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_text(&self, recipient: &str, text: &str) -> MessengerResult<()> {
        let message = SentMessage::Text {
            recipient: recipient.to_string(),
            text: text.to_string(),
            keyboard: None,
        };
        self.record(Some(recipient), message).await
    }

    async fn send_text_with_keyboard(
        &self,
        recipient: &str,
        text: &str,
        keyboard: &InlineKeyboard,
    ) -> MessengerResult<()> {
        let message = SentMessage::Text {
            recipient: recipient.to_string(),
            text: text.to_string(),
            keyboard: Some(keyboard.clone()),
        };
        self.record(Some(recipient), message).await
    }

    async fn send_photo(&self, recipient: &str, image: &str, caption: &str) -> MessengerResult<()> {
        let message = SentMessage::Photo {
            recipient: recipient.to_string(),
            image: image.to_string(),
            caption: caption.to_string(),
        };
        self.record(Some(recipient), message).await
    }

    async fn send_video(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()> {
        let message = SentMessage::Video {
            recipient: recipient.to_string(),
            file: file.to_string(),
            caption: caption.to_string(),
        };
        self.record(Some(recipient), message).await
    }

    async fn send_audio(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()> {
        let message = SentMessage::Audio {
            recipient: recipient.to_string(),
            file: file.to_string(),
            caption: caption.to_string(),
        };
        self.record(Some(recipient), message).await
    }

    async fn send_document(&self, recipient: &str, file: &str, caption: &str) -> MessengerResult<()> {
        let message = SentMessage::Document {
            recipient: recipient.to_string(),
            file: file.to_string(),
            caption: caption.to_string(),
        };
        self.record(Some(recipient), message).await
    }

    async fn delete_message(&self, conversation: &str, message_id: i64) -> MessengerResult<()> {
        let message = SentMessage::Deleted {
            conversation: conversation.to_string(),
            message_id,
        };
        self.record(None, message).await
    }

    async fn acknowledge(&self, callback_id: &str) -> MessengerResult<()> {
        let message = SentMessage::Acknowledged {
            callback_id: callback_id.to_string(),
        };
        self.record(None, message).await
    }
}
