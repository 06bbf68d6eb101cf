//! Shared fixtures for the integration tests
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Asia::Tashkent;
use prayer_reminder_bot::database::InMemoryContentStore;
use prayer_reminder_bot::messenger::RecordingMessenger;
use prayer_reminder_bot::models::{AdminSet, DuaSlots, PrayerName, PrayerTimings, RegionDescriptor};
use prayer_reminder_bot::prayer_times::StaticPrayerTimes;
use prayer_reminder_bot::services::{
    BotContext, BotServices, DeliverySettings, MockTimeProvider, RegionService,
};

pub const ADMIN: &str = "900";
pub const SECOND_ADMIN: &str = "901";

/// Every collaborator replaced by an inspectable double
pub struct Harness {
    pub store: InMemoryContentStore,
    pub messenger: RecordingMessenger,
    pub provider: StaticPrayerTimes,
    pub clock: Arc<MockTimeProvider>,
    pub context: BotContext,
    pub services: BotServices,
}

impl Harness {
    /// Clock set to the given Tashkent wall time on 2025-03-14
    pub fn at(hour: u32, minute: u32) -> Self {
        let clock = MockTimeProvider::at_local(Tashkent, 2025, 3, 14, hour, minute, 0).unwrap();
        Self::with_clock(clock)
    }

    pub fn with_clock(clock: MockTimeProvider) -> Self {
        let store = InMemoryContentStore::new();
        let messenger = RecordingMessenger::new();
        let provider = StaticPrayerTimes::new();
        provider.set(RegionDescriptor::local("Toshkent"), tashkent_timings());
        let clock = Arc::new(clock);

        let context = BotContext {
            store: Arc::new(store.clone()),
            provider: Arc::new(provider.clone()),
            messenger: Arc::new(messenger.clone()),
            regions: Arc::new(RegionService::builtin(Some(Tashkent))),
            dua_slots: DuaSlots::default(),
            admins: Arc::new(AdminSet::new([ADMIN, SECOND_ADMIN])),
            time_provider: clock.clone(),
            reference_timezone: Tashkent,
            settings: DeliverySettings {
                external_timeout: Duration::from_secs(2),
                concurrency: 4,
                broadcast_delay: Duration::ZERO,
            },
        };
        let services = BotServices::build(&context, Some("namoz_bot".to_string()));

        Self {
            store,
            messenger,
            provider,
            clock,
            context,
            services,
        }
    }
}

pub fn tashkent_timings() -> PrayerTimings {
    PrayerTimings::new(Some("14.03.2025".to_string()))
        .with_time(PrayerName::Fajr, "05:12")
        .with_time(PrayerName::Sunrise, "06:31")
        .with_time(PrayerName::Dhuhr, "12:35")
        .with_time(PrayerName::Asr, "16:03")
        .with_time(PrayerName::Maghrib, "18:34")
        .with_time(PrayerName::Isha, "19:53")
}
