//! Region Model
//!
//! A region key selects a display label, a prayer-time lookup descriptor and
//! the timezone reminders are evaluated in.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// How a region is looked up by the prayer-time provider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum RegionDescriptor {
    /// A city known to the national (islomapi.uz) service
    Local { region: String },
    /// A city/country pair resolved through the international (aladhan.com) service
    City { city: String, country: String },
}

impl RegionDescriptor {
    pub fn local(region: impl Into<String>) -> Self {
        RegionDescriptor::Local { region: region.into() }
    }

    pub fn city(city: impl Into<String>, country: impl Into<String>) -> Self {
        RegionDescriptor::City {
            city: city.into(),
            country: country.into(),
        }
    }
}

impl std::fmt::Display for RegionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegionDescriptor::Local { region } => write!(f, "{region}"),
            RegionDescriptor::City { city, country } => write!(f, "{city}, {country}"),
        }
    }
}

/// One entry of the region table
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub key: String,
    pub label: String,
    pub descriptor: RegionDescriptor,
    /// `None` means "use the configured fallback timezone"
    pub timezone: Option<Tz>,
}

impl Region {
    pub fn new(key: &str, label: &str, descriptor: RegionDescriptor, timezone: Option<Tz>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            descriptor,
            timezone,
        }
    }
}
