//! Region Service
//!
//! Owns the static region table: display label, prayer-time lookup descriptor
//! and timezone for every region key a subscriber can pick.

use chrono_tz::Tz;

use crate::error::ConfigurationError;
use crate::models::{Region, RegionDescriptor};

/// Result type for region lookups
pub type RegionResult<T> = Result<T, ConfigurationError>;

/// Lookup service over the configured region table
#[derive(Debug, Clone)]
pub struct RegionService {
    /// Regions in menu order
    regions: Vec<Region>,
    /// Timezone used for regions that carry none
    fallback_timezone: Option<Tz>,
}

impl RegionService {
    pub fn new(regions: Vec<Region>, fallback_timezone: Option<Tz>) -> Self {
        Self {
            regions,
            fallback_timezone,
        }
    }

    /// The built-in table of Uzbek provinces and neighbouring countries
    pub fn builtin(fallback_timezone: Option<Tz>) -> Self {
        Self::new(builtin_regions(), fallback_timezone)
    }

    /// Looks up a region by key
    pub fn resolve(&self, key: &str) -> RegionResult<&Region> {
        self.regions
            .iter()
            .find(|r| r.key == key)
            .ok_or_else(|| ConfigurationError::UnknownRegion(key.to_string()))
    }

    /// Timezone reminders for this region are evaluated in
    pub fn timezone_for(&self, key: &str) -> RegionResult<Tz> {
        let region = self.resolve(key)?;
        region
            .timezone
            .or(self.fallback_timezone)
            .ok_or_else(|| ConfigurationError::MissingTimezone(key.to_string()))
    }

    /// Display label for a key, if the key is known
    pub fn label_for(&self, key: &str) -> Option<&str> {
        self.resolve(key).ok().map(|r| r.label.as_str())
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn builtin_regions() -> Vec<Region> {
    use chrono_tz::{Asia, Europe};

    let local = |key: &str, label: &str, lookup: &str| {
        Region::new(key, label, RegionDescriptor::local(lookup), Some(Asia::Tashkent))
    };
    let abroad = |key: &str, label: &str, city: &str, country: &str, tz: Tz| {
        Region::new(key, label, RegionDescriptor::city(city, country), Some(tz))
    };

    vec![
        local("toshkent", "Toshkent", "Toshkent"),
        local("andijon", "Andijon", "Andijon"),
        local("fargona", "Farg'ona", "Farg'ona"),
        // The national service has no Namangan entry
        local("namangan", "Namangan", "Toshkent"),
        local("samarqand", "Samarqand", "Samarqand"),
        local("buxoro", "Buxoro", "Buxoro"),
        local("xorazm", "Xiva", "Xiva"),
        local("qarshi", "Qarshi", "Qarshi"),
        local("navoiy", "Navoiy", "Navoiy"),
        local("jizzax", "Jizzax", "Jizzax"),
        local("sirdaryo", "Sirdaryo", "Guliston"),
        local("surxondaryo", "Surxondaryo", "Termiz"),
        local("qoraqalpogiston", "Qoraqalpog'iston", "Nukus"),
        abroad("tojikiston", "Tojikiston", "Dushanbe", "Tajikistan", Asia::Dushanbe),
        abroad("qirgiziston", "Qirg'iziston", "Bishkek", "Kyrgyzstan", Asia::Bishkek),
        abroad("uyguriston", "Uyg'uriston", "Urumqi", "China", Asia::Urumqi),
        abroad("qozogiston", "Qozog‘iston", "Nur-Sultan", "Kazakhstan", Asia::Almaty),
        abroad("turkmaniston", "Turkmaniston", "Ashgabat", "Turkmenistan", Asia::Ashgabat),
        abroad("turkiya", "Turkiya", "Ankara", "Turkey", Europe::Istanbul),
        abroad("azarbayjon", "Ozarbayjon", "Baku", "Azerbaijan", Asia::Baku),
        abroad("gaza", "Falastin", "Gaza", "Palestine", Asia::Gaza),
    ]
}
