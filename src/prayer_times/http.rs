//! HTTP prayer-time provider
//!
//! Local regions go to islomapi.uz, foreign cities to aladhan.com.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use super::{PrayerTimeProvider, ProviderError};
use crate::models::{PrayerName, PrayerTimings, RegionDescriptor};

const ISLOMAPI_BASE: &str = "https://islomapi.uz";
const ALADHAN_BASE: &str = "https://api.aladhan.com";
/// Muslim World League calculation method
const ALADHAN_METHOD: u8 = 2;

#[derive(Debug, Deserialize)]
struct IslomapiDay {
    region: Option<String>,
    date: Option<String>,
    times: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct AladhanResponse {
    code: u16,
    data: Option<AladhanData>,
}

#[derive(Debug, Deserialize)]
struct AladhanData {
    timings: HashMap<String, String>,
    date: Option<AladhanDate>,
}

#[derive(Debug, Deserialize)]
struct AladhanDate {
    readable: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpPrayerTimeProvider {
    client: reqwest::Client,
    islomapi_base: String,
    aladhan_base: String,
}

impl HttpPrayerTimeProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_bases(ISLOMAPI_BASE, ALADHAN_BASE, timeout)
    }

    pub fn with_bases(
        islomapi_base: impl Into<String>,
        aladhan_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable {
                descriptor: "client".to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            islomapi_base: islomapi_base.into().trim_end_matches('/').to_string(),
            aladhan_base: aladhan_base.into().trim_end_matches('/').to_string(),
        })
    }

    /// Today's timings for one islomapi region; the service answers in Tashkent time
    fn present_day_request(&self, region: &str) -> reqwest::Result<reqwest::Request> {
        self.client
            .get(format!("{}/api/present/day", self.islomapi_base))
            .query(&[("region", region)])
            .build()
    }

    async fn resolve_local(&self, descriptor: &RegionDescriptor, region: &str) -> Result<PrayerTimings, ProviderError> {
        let request = self
            .present_day_request(region)
            .map_err(|e| ProviderError::unavailable(descriptor, e.to_string()))?;

        let body: IslomapiDay = self
            .client
            .execute(request)
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| ProviderError::unavailable(descriptor, e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::unavailable(descriptor, e.to_string()))?;

        let label = body.date.or(body.region);
        Ok(timings_from_uzbek_keys(label, &body.times))
    }

    async fn resolve_city(
        &self,
        descriptor: &RegionDescriptor,
        city: &str,
        country: &str,
        date: NaiveDate,
    ) -> Result<PrayerTimings, ProviderError> {
        let url = format!("{}/v1/timingsByCity/{}", self.aladhan_base, date.format("%d-%m-%Y"));
        let method = ALADHAN_METHOD.to_string();

        let body: AladhanResponse = self
            .client
            .get(&url)
            .query(&[("city", city), ("country", country), ("method", method.as_str())])
            .send()
            .await
            .map_err(|e| ProviderError::unavailable(descriptor, e.to_string()))?
            .json()
            .await
            .map_err(|e| ProviderError::unavailable(descriptor, e.to_string()))?;

        let data = match body.data {
            Some(data) if body.code == 200 => data,
            _ => return Err(ProviderError::unavailable(descriptor, format!("status code {}", body.code))),
        };

        let label = data.date.and_then(|d| d.readable);
        Ok(timings_from_english_keys(label, &data.timings))
    }
}

fn timings_from_uzbek_keys(label: Option<String>, times: &HashMap<String, String>) -> PrayerTimings {
    let mut timings = PrayerTimings::new(label);
    for (key, value) in times {
        if let Some(prayer) = PrayerName::from_uzbek_key(key) {
            timings.insert(prayer, value.clone());
        }
    }
    timings
}

fn timings_from_english_keys(label: Option<String>, times: &HashMap<String, String>) -> PrayerTimings {
    let mut timings = PrayerTimings::new(label);
    for prayer in PrayerName::all() {
        if let Some(value) = times.get(prayer.as_ref()) {
            timings.insert(prayer, value.clone());
        }
    }
    timings
}

#[async_trait]
impl PrayerTimeProvider for HttpPrayerTimeProvider {
    async fn resolve(&self, descriptor: &RegionDescriptor, date: NaiveDate) -> Result<PrayerTimings, ProviderError> {
        debug!(descriptor = %descriptor, date = %date, "Resolving prayer timings");

        let timings = match descriptor {
            RegionDescriptor::Local { region } => self.resolve_local(descriptor, region).await?,
            RegionDescriptor::City { city, country } => self.resolve_city(descriptor, city, country, date).await?,
        };

        if timings.is_empty() {
            return Err(ProviderError::NoTimings {
                descriptor: descriptor.to_string(),
            });
        }
        Ok(timings)
    }
}
