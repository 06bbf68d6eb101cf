//! Dua Time Model
//!
//! Fixed daily clock times a subscriber may pick for devotional delivery.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::prayer::ClockTime;

/// Errors raised while parsing a dua-time slot
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DuaTimeError {
    #[error("Malformed dua time slot: {0} (expected HH:MM)")]
    Malformed(String),

    #[error("Dua time slot {0} is not offered")]
    NotOffered(String),
}

fn slot_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("static slot pattern"))
}

/// One canonical `"HH:MM"` delivery slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DuaSlot(ClockTime);

impl DuaSlot {
    pub fn new(hour: u32, minute: u32) -> Result<Self, DuaTimeError> {
        if hour > 23 || minute > 59 {
            return Err(DuaTimeError::Malformed(format!("{hour}:{minute}")));
        }
        Ok(Self(ClockTime { hour, minute }))
    }

    pub fn hour(&self) -> u32 {
        self.0.hour
    }

    pub fn minute(&self) -> u32 {
        self.0.minute
    }

    /// Six-field cron expression firing daily at this slot
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.0.minute, self.0.hour)
    }
}

impl FromStr for DuaSlot {
    type Err = DuaTimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !slot_pattern().is_match(s) {
            return Err(DuaTimeError::Malformed(s.to_string()));
        }
        ClockTime::parse(s)
            .map(DuaSlot)
            .ok_or_else(|| DuaTimeError::Malformed(s.to_string()))
    }
}

impl std::fmt::Display for DuaSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl Serialize for DuaSlot {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for DuaSlot {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// The configured set of offered slots, in display order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuaSlots(Vec<DuaSlot>);

impl DuaSlots {
    pub fn new(slots: Vec<DuaSlot>) -> Self {
        Self(slots)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DuaSlot> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parses a user-selected slot and checks it is one of the offered ones
    pub fn resolve(&self, raw: &str) -> Result<DuaSlot, DuaTimeError> {
        let slot: DuaSlot = raw.parse()?;
        if self.0.contains(&slot) {
            Ok(slot)
        } else {
            Err(DuaTimeError::NotOffered(raw.to_string()))
        }
    }
}

impl Default for DuaSlots {
    fn default() -> Self {
        Self(
            [(8, 0), (10, 0), (12, 0), (14, 0), (20, 0), (22, 0)]
                .into_iter()
                .map(|(h, m)| DuaSlot(ClockTime { hour: h, minute: m }))
                .collect(),
        )
    }
}
