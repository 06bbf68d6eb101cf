//! Telegram update payloads
//!
//! Only the fields the bot reads are modelled. Conversion to
//! [`InboundEvent`] happens here so nothing past the transport sees raw
//! callback strings or message JSON.

use serde::Deserialize;
use serde_json::Value;

use crate::models::{CallbackIntent, Command, InboundEvent, MessageContent, Sender};

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: Option<String>,
    pub username: Option<String>,
}

impl From<&User> for Sender {
    fn from(user: &User) -> Self {
        Sender {
            id: user.id.to_string(),
            name: user.first_name.clone(),
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileRef {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
    pub video: Option<FileRef>,
    pub audio: Option<FileRef>,
    pub document: Option<FileRef>,
    pub sticker: Option<Value>,
    pub voice: Option<Value>,
    pub animation: Option<Value>,
    pub location: Option<Value>,
    pub contact: Option<Value>,
}

impl Message {
    fn sender(&self) -> Sender {
        self.from
            .as_ref()
            .map(Sender::from)
            .unwrap_or_else(|| Sender::new(self.chat.id.to_string()))
    }

    fn content(&self) -> MessageContent {
        let caption = self.caption.clone();

        if let Some(text) = &self.text {
            return MessageContent::Text(text.clone());
        }
        if let Some(largest) = self
            .photo
            .as_ref()
            .and_then(|sizes| sizes.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height)))
        {
            return MessageContent::Photo {
                file_id: largest.file_id.clone(),
                caption,
            };
        }
        // Animations also carry a `document` field; they are not relayed
        if self.animation.is_some() {
            return MessageContent::Unsupported {
                kind: "animation".to_string(),
            };
        }
        if let Some(video) = &self.video {
            return MessageContent::Video {
                file_id: video.file_id.clone(),
                caption,
            };
        }
        if let Some(audio) = &self.audio {
            return MessageContent::Audio {
                file_id: audio.file_id.clone(),
                caption,
            };
        }
        if let Some(document) = &self.document {
            return MessageContent::Document {
                file_id: document.file_id.clone(),
                caption,
            };
        }

        let kind = [
            ("sticker", self.sticker.is_some()),
            ("voice", self.voice.is_some()),
            ("location", self.location.is_some()),
            ("contact", self.contact.is_some()),
        ]
        .into_iter()
        .find_map(|(kind, present)| present.then_some(kind))
        .unwrap_or("other");

        MessageContent::Unsupported { kind: kind.to_string() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackMessage {
    pub message_id: i64,
    pub chat: Chat,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<CallbackMessage>,
    pub data: Option<String>,
}

impl Update {
    /// The event this update carries, if it is one the bot reacts to
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(query) = self.callback_query {
            let data = query.data.unwrap_or_default();
            let intent = data.parse::<CallbackIntent>().unwrap_or_else(|never| match never {});
            let conversation = query
                .message
                .as_ref()
                .map(|m| m.chat.id)
                .unwrap_or(query.from.id)
                .to_string();

            return Some(InboundEvent::Callback {
                conversation,
                sender: Sender::from(&query.from),
                callback_id: query.id,
                message_id: query.message.map(|m| m.message_id),
                intent,
            });
        }

        let message = self.message?;
        let conversation = message.chat.id.to_string();
        let sender = message.sender();

        if let Some(command) = message.text.as_deref().and_then(Command::parse) {
            return Some(InboundEvent::Command {
                conversation,
                sender,
                command,
            });
        }

        Some(InboundEvent::Message {
            conversation,
            content: message.content(),
            sender,
        })
    }
}
