//! Models module for the prayer reminder bot
//!
//! Contains all data models and their validation logic.

pub mod admin;
pub mod devotional_item;
pub mod dua_time;
pub mod events;
pub mod prayer;
pub mod region;
pub mod session;
pub mod subscriber;

// Re-export commonly used types
pub use admin::AdminSet;
pub use devotional_item::DevotionalItem;
pub use dua_time::{DuaSlot, DuaSlots, DuaTimeError};
pub use events::{CallbackIntent, Command, InboundEvent, MessageContent, Sender};
pub use prayer::{ClockTime, PrayerName, PrayerTimings, ReminderTexts};
pub use region::{Region, RegionDescriptor};
pub use session::{ConversationSession, SessionStep};
pub use subscriber::{Subscriber, SubscriberPatch};
