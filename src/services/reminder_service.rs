//! Prayer Reminder Service
//!
//! Runs once per minute. Subscribers are grouped by region so each region's
//! timings are fetched once per tick; a reminder fires when the subscriber's
//! local time, truncated to the minute, equals "today at HH:MM:00" in the
//! region's timezone. Equality, not a range check: a tick that runs late
//! misses that minute for good.
//!
//! A (subscriber, prayer) -> local date ledger is checked and set atomically
//! before each send, so re-running a tick within the matching minute never
//! sends twice.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, warn, Instrument};

use crate::database::ContentStore;
use crate::error::BotResult;
use crate::logging::{log_delivery_failure, log_fanout_summary, log_provider_failure, log_reminder_sent};
use crate::messenger::Messenger;
use crate::models::{PrayerName, ReminderTexts, Subscriber};
use crate::prayer_times::PrayerTimeProvider;
use crate::services::delivery::{with_deadline, DeliverySettings};
use crate::services::region_service::RegionService;
use crate::services::time_provider::TimeProvider;

/// Outcome of one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// Subscribers with a region
    pub subscribers: usize,
    /// Distinct regions evaluated
    pub regions: usize,
    /// Subscribers skipped because their region could not be evaluated
    pub skipped: usize,
    /// Reminders whose minute matched
    pub due: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Due reminders already sent earlier the same day
    pub duplicates: usize,
}

#[derive(Debug, Clone)]
struct DueReminder {
    subscriber: String,
    region: String,
    prayer: PrayerName,
    local_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeliveryOutcome {
    Delivered,
    Failed,
    Duplicate,
}

pub struct ReminderService {
    store: Arc<dyn ContentStore>,
    provider: Arc<dyn PrayerTimeProvider>,
    messenger: Arc<dyn Messenger>,
    regions: Arc<RegionService>,
    time_provider: Arc<dyn TimeProvider>,
    settings: DeliverySettings,
    texts: ReminderTexts,
    sent_ledger: DashMap<(String, PrayerName), NaiveDate>,
}

impl ReminderService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        provider: Arc<dyn PrayerTimeProvider>,
        messenger: Arc<dyn Messenger>,
        regions: Arc<RegionService>,
        time_provider: Arc<dyn TimeProvider>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            store,
            provider,
            messenger,
            regions,
            time_provider,
            settings,
            texts: ReminderTexts::default(),
            sent_ledger: DashMap::new(),
        }
    }

    /// Replaces the reminder texts; prayers without a text never fire
    pub fn with_texts(mut self, texts: ReminderTexts) -> Self {
        self.texts = texts;
        self
    }

    /// Whether a reminder for `prayer` was sent to `subscriber` on `local_date`
    pub fn already_sent(&self, subscriber: &str, prayer: PrayerName, local_date: NaiveDate) -> bool {
        self.sent_ledger
            .get(&(subscriber.to_string(), prayer))
            .is_some_and(|sent| *sent == local_date)
    }

    /// Evaluates every subscriber with a region and sends the reminders due this minute
    pub async fn tick(&self) -> BotResult<TickReport> {
        let span = crate::tick_span!(self.time_provider.now_utc());
        self.run_tick().instrument(span).await
    }

    async fn run_tick(&self) -> BotResult<TickReport> {
        let timeout = self.settings.external_timeout;
        let workers = self.settings.workers();

        let subscribers = with_deadline(
            "list_subscribers_with_region",
            timeout,
            self.store.list_subscribers_with_region(),
        )
        .await?;

        let mut report = TickReport {
            subscribers: subscribers.len(),
            ..TickReport::default()
        };

        let mut by_region: BTreeMap<String, Vec<Subscriber>> = BTreeMap::new();
        for subscriber in subscribers {
            if let Some(region) = subscriber.region.clone() {
                by_region.entry(region).or_default().push(subscriber);
            }
        }
        report.regions = by_region.len();

        let evaluations: Vec<(String, usize, BotResult<Vec<DueReminder>>)> = stream::iter(by_region.into_iter())
            .map(|(key, members)| async move {
                let evaluation = self.evaluate_region(&key, &members).await;
                (key, members.len(), evaluation)
            })
            .buffer_unordered(workers)
            .collect()
            .await;

        let mut due = Vec::new();
        for (key, affected, evaluation) in evaluations {
            match evaluation {
                Ok(reminders) => due.extend(reminders),
                Err(error) if error.is_per_recipient() => {
                    log_provider_failure(&key, affected, &error);
                    report.skipped += affected;
                }
                Err(error) => {
                    warn!(region = %key, affected, error = %error, "Subscribers reference an unusable region");
                    report.skipped += affected;
                }
            }
        }
        report.due = due.len();

        let outcomes: Vec<DeliveryOutcome> = stream::iter(due)
            .map(|reminder| self.deliver(reminder))
            .buffer_unordered(workers)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                DeliveryOutcome::Delivered => report.delivered += 1,
                DeliveryOutcome::Failed => report.failed += 1,
                DeliveryOutcome::Duplicate => report.duplicates += 1,
            }
        }

        tracing::Span::current().record("subscribers", report.subscribers);
        tracing::Span::current().record("delivered", report.delivered);
        if report.due > 0 {
            log_fanout_summary("prayer_reminder", "tick", report.delivered, report.due, report.failed);
        }

        Ok(report)
    }

    /// Reminders due this minute for every member of one region
    async fn evaluate_region(&self, key: &str, members: &[Subscriber]) -> BotResult<Vec<DueReminder>> {
        let region = self.regions.resolve(key)?;
        let timezone = self.regions.timezone_for(key)?;

        let now = self.time_provider.minute_in_timezone(timezone);
        let today = now.date_naive();

        let timings = with_deadline(
            "resolve_prayer_times",
            self.settings.external_timeout,
            self.provider.resolve(&region.descriptor, today),
        )
        .await?;

        let mut due = Vec::new();
        for prayer in self.texts.prayers() {
            let Some(at) = timings.time_of(prayer) else {
                debug!(region = %key, prayer = %prayer, "No usable timing for prayer");
                continue;
            };

            let Some(target) = today
                .and_hms_opt(at.hour, at.minute, 0)
                .and_then(|naive| timezone.from_local_datetime(&naive).single())
            else {
                debug!(region = %key, prayer = %prayer, time = %at, "Prayer time is ambiguous or skipped locally, no reminder");
                continue;
            };

            if target == now {
                due.extend(members.iter().map(|member| DueReminder {
                    subscriber: member.id.clone(),
                    region: key.to_string(),
                    prayer,
                    local_date: today,
                }));
            }
        }

        Ok(due)
    }

    async fn deliver(&self, reminder: DueReminder) -> DeliveryOutcome {
        let Some(text) = self.texts.get(reminder.prayer) else {
            return DeliveryOutcome::Failed;
        };

        if !self.claim(&reminder.subscriber, reminder.prayer, reminder.local_date) {
            debug!(subscriber = %reminder.subscriber, prayer = %reminder.prayer, "Reminder already sent today");
            return DeliveryOutcome::Duplicate;
        }

        let sent = with_deadline(
            "send_prayer_reminder",
            self.settings.external_timeout,
            self.messenger.send_text(&reminder.subscriber, text),
        )
        .await;

        match sent {
            Ok(()) => {
                log_reminder_sent(&reminder.subscriber, reminder.prayer.as_ref(), &reminder.region);
                DeliveryOutcome::Delivered
            }
            Err(error) => {
                self.release(&reminder.subscriber, reminder.prayer, reminder.local_date);
                log_delivery_failure(&reminder.subscriber, "prayer_reminder", &error);
                DeliveryOutcome::Failed
            }
        }
    }

    /// Records the send for `local_date`; false when it was already recorded
    fn claim(&self, subscriber: &str, prayer: PrayerName, local_date: NaiveDate) -> bool {
        match self.sent_ledger.entry((subscriber.to_string(), prayer)) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == local_date {
                    false
                } else {
                    entry.insert(local_date);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(local_date);
                true
            }
        }
    }

    fn release(&self, subscriber: &str, prayer: PrayerName, local_date: NaiveDate) {
        self.sent_ledger
            .remove_if(&(subscriber.to_string(), prayer), |_, sent| *sent == local_date);
    }
}
