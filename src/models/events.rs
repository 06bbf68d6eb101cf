//! Inbound Event Model
//!
//! Structured events produced by the transport layer. Callback payloads are
//! parsed into [`CallbackIntent`] at the boundary so handlers never inspect
//! raw strings.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Who sent an event
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Sender {
    pub id: String,
    pub name: Option<String>,
    pub username: Option<String>,
}

impl Sender {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// Slash commands understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Start,
    Panel,
}

impl Command {
    /// Recognises `/start`, `/start 123`, `/panel` and `/panel@botname`
    pub fn parse(text: &str) -> Option<Self> {
        let word = text.split_whitespace().next()?;
        let word = word.split('@').next()?;
        match word {
            "/start" => Some(Command::Start),
            "/panel" => Some(Command::Panel),
            _ => None,
        }
    }
}

/// Payload of a non-command message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageContent {
    Text(String),
    Photo { file_id: String, caption: Option<String> },
    Video { file_id: String, caption: Option<String> },
    Audio { file_id: String, caption: Option<String> },
    Document { file_id: String, caption: Option<String> },
    /// Stickers, voice notes, locations and anything else the bot does not relay
    Unsupported { kind: String },
}

impl MessageContent {
    pub fn text(&self) -> Option<&str> {
        match self {
            MessageContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Short label for logging
    pub fn kind(&self) -> &str {
        match self {
            MessageContent::Text(_) => "text",
            MessageContent::Photo { .. } => "photo",
            MessageContent::Video { .. } => "video",
            MessageContent::Audio { .. } => "audio",
            MessageContent::Document { .. } => "document",
            MessageContent::Unsupported { kind } => kind,
        }
    }
}

/// Button actions carried in callback payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallbackIntent {
    PrayTimes,
    SelectRegion(String),
    DuaMenu,
    SelectDuaTime(String),
    Library,
    SendFeedback,
    AdminAddDua,
    AdminBroadcast,
    Unknown(String),
}

const REGION_PREFIX: &str = "region_";
const DUA_TIME_PREFIX: &str = "set_dua_time_";

impl FromStr for CallbackIntent {
    type Err = std::convert::Infallible;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let intent = match data {
            "pray_times" => CallbackIntent::PrayTimes,
            "dua" => CallbackIntent::DuaMenu,
            "library" => CallbackIntent::Library,
            "send_admin" => CallbackIntent::SendFeedback,
            "admin_add_dua" => CallbackIntent::AdminAddDua,
            "admin_broadcast" => CallbackIntent::AdminBroadcast,
            other => {
                if let Some(key) = other.strip_prefix(REGION_PREFIX) {
                    CallbackIntent::SelectRegion(key.to_string())
                } else if let Some(slot) = other.strip_prefix(DUA_TIME_PREFIX) {
                    CallbackIntent::SelectDuaTime(slot.to_string())
                } else {
                    CallbackIntent::Unknown(other.to_string())
                }
            }
        };
        Ok(intent)
    }
}

impl std::fmt::Display for CallbackIntent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallbackIntent::PrayTimes => write!(f, "pray_times"),
            CallbackIntent::SelectRegion(key) => write!(f, "{REGION_PREFIX}{key}"),
            CallbackIntent::DuaMenu => write!(f, "dua"),
            CallbackIntent::SelectDuaTime(slot) => write!(f, "{DUA_TIME_PREFIX}{slot}"),
            CallbackIntent::Library => write!(f, "library"),
            CallbackIntent::SendFeedback => write!(f, "send_admin"),
            CallbackIntent::AdminAddDua => write!(f, "admin_add_dua"),
            CallbackIntent::AdminBroadcast => write!(f, "admin_broadcast"),
            CallbackIntent::Unknown(raw) => write!(f, "{raw}"),
        }
    }
}

/// An inbound event addressed to one conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InboundEvent {
    Command {
        conversation: String,
        sender: Sender,
        command: Command,
    },
    Callback {
        conversation: String,
        sender: Sender,
        callback_id: String,
        /// The menu message the button belonged to
        message_id: Option<i64>,
        intent: CallbackIntent,
    },
    Message {
        conversation: String,
        sender: Sender,
        content: MessageContent,
    },
}

impl InboundEvent {
    pub fn conversation(&self) -> &str {
        match self {
            InboundEvent::Command { conversation, .. }
            | InboundEvent::Callback { conversation, .. }
            | InboundEvent::Message { conversation, .. } => conversation,
        }
    }

    pub fn sender(&self) -> &Sender {
        match self {
            InboundEvent::Command { sender, .. }
            | InboundEvent::Callback { sender, .. }
            | InboundEvent::Message { sender, .. } => sender,
        }
    }

    /// Convenience constructor for a plain text message from a private chat
    pub fn text(conversation: impl Into<String>, text: impl Into<String>) -> Self {
        let conversation = conversation.into();
        InboundEvent::Message {
            sender: Sender::new(conversation.clone()),
            conversation,
            content: MessageContent::Text(text.into()),
        }
    }

    /// Convenience constructor for a button press in a private chat
    pub fn callback(conversation: impl Into<String>, intent: CallbackIntent) -> Self {
        let conversation = conversation.into();
        InboundEvent::Callback {
            sender: Sender::new(conversation.clone()),
            callback_id: uuid::Uuid::new_v4().to_string(),
            message_id: None,
            conversation,
            intent,
        }
    }
}
