//! Prayer Model
//!
//! Canonical prayer names, per-day timings and the reminder texts sent when a
//! prayer time arrives.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

/// The six canonical daily prayer identifiers
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, AsRefStr,
)]
pub enum PrayerName {
    Fajr,
    Sunrise,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// All canonical names in daily order
    pub fn all() -> impl Iterator<Item = PrayerName> {
        PrayerName::iter()
    }

    /// Local (Uzbek) label used when listing timings to a user
    pub fn display_name(&self) -> &'static str {
        match self {
            PrayerName::Fajr => "Bomdod",
            PrayerName::Sunrise => "Quyosh",
            PrayerName::Dhuhr => "Peshin",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Shom",
            PrayerName::Isha => "Xufton",
        }
    }

    /// Maps a key of the islomapi.uz `times` object onto a canonical name
    pub fn from_uzbek_key(key: &str) -> Option<Self> {
        match key {
            "tong_saharlik" => Some(PrayerName::Fajr),
            "quyosh" => Some(PrayerName::Sunrise),
            "peshin" => Some(PrayerName::Dhuhr),
            "asr" => Some(PrayerName::Asr),
            "shom_iftor" => Some(PrayerName::Maghrib),
            "hufton" => Some(PrayerName::Isha),
            _ => None,
        }
    }
}

/// Wall-clock time of day parsed from an `"HH:MM"` timing string
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    /// Parses `"HH:MM"`, `"H:MM"` or a bare `"HH"` (minutes default to zero).
    ///
    /// Trailing annotations such as `"05:12 (+05)"` are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let head = trimmed.split_whitespace().next()?;
        let mut parts = head.splitn(2, ':');

        let hour = parts.next()?.trim().parse::<u32>().ok()?;
        let minute = match parts.next() {
            Some(m) if !m.trim().is_empty() => m.trim().parse::<u32>().ok()?,
            _ => 0,
        };

        if hour > 23 || minute > 59 {
            return None;
        }

        Some(Self { hour, minute })
    }
}

impl std::fmt::Display for ClockTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Prayer timings for one region on one day, as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrayerTimings {
    /// Human readable date reported by the provider, if any
    pub date_label: Option<String>,
    times: HashMap<PrayerName, String>,
}

impl PrayerTimings {
    pub fn new(date_label: Option<String>) -> Self {
        Self {
            date_label,
            times: HashMap::new(),
        }
    }

    pub fn with_time(mut self, prayer: PrayerName, time: impl Into<String>) -> Self {
        self.insert(prayer, time);
        self
    }

    pub fn insert(&mut self, prayer: PrayerName, time: impl Into<String>) {
        self.times.insert(prayer, time.into());
    }

    /// Raw timing string for a prayer
    pub fn raw(&self, prayer: PrayerName) -> Option<&str> {
        self.times.get(&prayer).map(String::as_str)
    }

    /// Parsed timing for a prayer; `None` when missing or malformed
    pub fn time_of(&self, prayer: PrayerName) -> Option<ClockTime> {
        self.raw(prayer).and_then(ClockTime::parse)
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}

/// Reminder text per prayer. Prayers without an entry never trigger a reminder.
#[derive(Debug, Clone)]
pub struct ReminderTexts {
    texts: HashMap<PrayerName, String>,
}

impl ReminderTexts {
    pub fn new(texts: HashMap<PrayerName, String>) -> Self {
        Self { texts }
    }

    pub fn get(&self, prayer: PrayerName) -> Option<&str> {
        self.texts.get(&prayer).map(String::as_str)
    }

    /// Prayers that carry a reminder, in daily order
    pub fn prayers(&self) -> Vec<PrayerName> {
        PrayerName::all().filter(|p| self.texts.contains_key(p)).collect()
    }
}

impl Default for ReminderTexts {
    fn default() -> Self {
        let mut texts = HashMap::new();
        texts.insert(
            PrayerName::Fajr,
            "<b>🌅 Bomdod namozi vaqti kirdi.</b>\n\n<b>١٤. قَدْ أَفْلَحَ مَن تَزَكَّىٰ\n\n\
             14. Haqiqatan, kim pok bo'lsa, yutuq topadir. | A'laa surasi</b>"
                .to_string(),
        );
        texts.insert(
            PrayerName::Dhuhr,
            "<b>☀️ Peshin namozi vaqti kirdi.</b>\n\n<b>١٥. وَذَكَرَ ٱسْمَ رَبِّهِۦ فَصَلَّىٰ\n\n\
             15. Va Robbining ismini zikr qilsa va namoz o'qisa hamdir. | A'laa surasi</b>"
                .to_string(),
        );
        texts.insert(
            PrayerName::Asr,
            "<b>🌇 Asr namozi vaqti kirdi.</b>\n\n<b>١٥٣. يَٰٓأَيُّهَا ٱلَّذِينَ ءَامَنُوا۟ ٱسْتَعِينُوا۟ بِٱلصَّبْرِ وَٱلصَّلَوٰةِ إِنَّ ٱللَّهَ مَعَ ٱلصَّٰبِرِينَ\n\n\
             153. Ey iymon keltirganlar! Sabr va namoz ila madad so'ranglar. Albatta, Alloh sabrlilar bilandir. | Baqara surasi</b>"
                .to_string(),
        );
        texts.insert(
            PrayerName::Maghrib,
            "<b>🌆 Shom namozi vaqti kirdi.</b>\n\n<b>٤٥. وَٱسْتَعِينُوا۟ بِٱلصَّبْرِ وَٱلصَّلَوٰةِ وَإِنَّهَا لَكَبِيرَةٌ إِلَّا عَلَى ٱلْخَٰشِعِينَ\n\n\
             45. Sabr va namoz ila yordam so'rang. Va albatta, u nafsi siniqlardan boshqalarga juda katta ishdir. | Baqara surasi</b>"
                .to_string(),
        );
        texts.insert(
            PrayerName::Isha,
            "<b>🌙 Xufton namozi vaqti keldi.</b><b>٤٥. وَٱسْتَعِينُوا۟ بِٱلصَّبْرِ وَٱلصَّلَوٰةِ وَإِنَّهَا لَكَبِيرَةٌ إِلَّا عَلَى ٱلْخَٰشِعِينَ\n\n\
             45. Sabr va namoz ila yordam so'rang. Va albatta, u nafsi siniqlardan boshqalarga juda katta ishdir. | Rum surasi</b>"
                .to_string(),
        );
        Self { texts }
    }
}
