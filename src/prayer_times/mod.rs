//! Prayer-time lookup
//!
//! Resolves a region descriptor to the day's prayer timings. Timings are
//! never persisted; every caller fetches them fresh.

pub mod http;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{PrayerTimings, RegionDescriptor};

pub use http::HttpPrayerTimeProvider;

/// Errors that can occur during a prayer-time lookup
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    #[error("Lookup for {descriptor} failed: {reason}")]
    Unavailable { descriptor: String, reason: String },

    #[error("Lookup for {descriptor} returned no timings")]
    NoTimings { descriptor: String },
}

impl ProviderError {
    pub fn unavailable(descriptor: &RegionDescriptor, reason: impl Into<String>) -> Self {
        ProviderError::Unavailable {
            descriptor: descriptor.to_string(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait PrayerTimeProvider: Send + Sync {
    async fn resolve(&self, descriptor: &RegionDescriptor, date: NaiveDate) -> Result<PrayerTimings, ProviderError>;
}

/// Provider returning canned timings, for tests and offline runs
#[derive(Debug, Clone, Default)]
pub struct StaticPrayerTimes {
    timings: Arc<Mutex<HashMap<RegionDescriptor, PrayerTimings>>>,
    calls: Arc<Mutex<Vec<(RegionDescriptor, NaiveDate)>>>,
}

impl StaticPrayerTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timings returned for a descriptor; descriptors without an entry fail
    pub fn set(&self, descriptor: RegionDescriptor, timings: PrayerTimings) {
        if let Ok(mut map) = self.timings.lock() {
            map.insert(descriptor, timings);
        }
    }

    /// Every lookup made so far
    pub fn calls(&self) -> Vec<(RegionDescriptor, NaiveDate)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PrayerTimeProvider for StaticPrayerTimes {
    async fn resolve(&self, descriptor: &RegionDescriptor, date: NaiveDate) -> Result<PrayerTimings, ProviderError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((descriptor.clone(), date));
        }

        self.timings
            .lock()
            .ok()
            .and_then(|map| map.get(descriptor).cloned())
            .ok_or_else(|| ProviderError::unavailable(descriptor, "no canned timings"))
    }
}
