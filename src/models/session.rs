//! Conversation Session Model
//!
//! Transient per-conversation state for the multi-step flows. `Idle` is the
//! absence of a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::AsRefStr;

/// The step a conversation is waiting on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, AsRefStr)]
pub enum SessionStep {
    /// A user asked to send feedback to the administrators
    AwaitingFeedback,
    /// An administrator is adding a dua; an image may be staged before the text
    AwaitingDuaContent { staged_image: Option<String> },
    /// An administrator is about to send an announcement
    AwaitingBroadcastContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSession {
    pub step: SessionStep,
    pub started_at: DateTime<Utc>,
}

impl ConversationSession {
    pub fn new(step: SessionStep, started_at: DateTime<Utc>) -> Self {
        Self { step, started_at }
    }

    pub fn awaiting_feedback(now: DateTime<Utc>) -> Self {
        Self::new(SessionStep::AwaitingFeedback, now)
    }

    pub fn awaiting_dua_content(now: DateTime<Utc>) -> Self {
        Self::new(SessionStep::AwaitingDuaContent { staged_image: None }, now)
    }

    pub fn awaiting_broadcast(now: DateTime<Utc>) -> Self {
        Self::new(SessionStep::AwaitingBroadcastContent, now)
    }

    /// Step name for logging
    pub fn step_name(&self) -> &str {
        self.step.as_ref()
    }

    pub fn is_older_than(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        now - self.started_at > max_age
    }
}
