//! Subscriber Model
//!
//! An end recipient tracked by identity with optional region and dua-time preferences.

use serde::{Deserialize, Serialize};

/// A subscriber as persisted by the content store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscriber {
    /// Opaque, stable recipient id (the chat id)
    pub id: String,

    /// Display name (first name)
    pub name: Option<String>,

    /// Handle without the leading `@`
    pub username: Option<String>,

    /// Key into the region table; `None` excludes the subscriber from prayer reminders
    pub region: Option<String>,

    /// `"HH:MM"` slot; `None` excludes the subscriber from daily dua delivery
    pub dua_time: Option<String>,
}

impl Subscriber {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            username: None,
            region: None,
            dua_time: None,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_dua_time(mut self, dua_time: impl Into<String>) -> Self {
        self.dua_time = Some(dua_time.into());
        self
    }

    /// Whether the subscriber takes part in prayer reminders
    pub fn has_region(&self) -> bool {
        self.region.as_deref().is_some_and(|r| !r.is_empty())
    }

    /// Applies a partial update; absent patch fields leave stored values untouched
    pub fn apply(&mut self, patch: &SubscriberPatch) {
        if patch.name.is_some() {
            self.name.clone_from(&patch.name);
        }
        if patch.username.is_some() {
            self.username.clone_from(&patch.username);
        }
        if patch.region.is_some() {
            self.region.clone_from(&patch.region);
        }
        if patch.dua_time.is_some() {
            self.dua_time.clone_from(&patch.dua_time);
        }
    }
}

/// Fields written by the region and dua-time selection interactions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriberPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub region: Option<String>,
    pub dua_time: Option<String>,
}

impl SubscriberPatch {
    /// Patch carrying the sender's profile fields
    pub fn profile(name: Option<String>, username: Option<String>) -> Self {
        Self {
            name,
            username,
            ..Self::default()
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn dua_time(mut self, dua_time: impl Into<String>) -> Self {
        self.dua_time = Some(dua_time.into());
        self
    }
}
