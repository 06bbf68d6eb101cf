//! A stalled delivery times out and counts as one failed recipient

use std::time::Duration;

use crate::common::Harness;
use prayer_reminder_bot::database::ContentStore;
use prayer_reminder_bot::models::{DevotionalItem, MessageContent, PrayerName, Subscriber};
use prayer_reminder_bot::services::{BroadcastReport, DeliveryReport};

const STALL: Duration = Duration::from_secs(30);

#[tokio::test(start_paused = true)]
async fn test_stalled_broadcast_recipient_counts_as_error() {
    let harness = Harness::at(9, 0);
    for id in ["1", "2", "3"] {
        harness.store.put_subscriber(Subscriber::new(id)).await;
    }
    harness.messenger.stall_for("2", STALL);

    let report = harness
        .services
        .broadcasts
        .broadcast(&MessageContent::Text("Juma muborak".into()))
        .await
        .unwrap();

    assert_eq!(report, BroadcastReport { sent: 2, errors: 1 });
    assert_eq!(harness.messenger.sent_to("1").len(), 1);
    assert_eq!(harness.messenger.sent_to("3").len(), 1);
    assert!(harness.messenger.sent_to("2").is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_reminder_is_failed_and_not_marked_sent() {
    let harness = Harness::at(5, 12);
    for id in ["1", "2"] {
        harness
            .store
            .put_subscriber(Subscriber::new(id).with_region("toshkent"))
            .await;
    }
    harness.messenger.stall_for("1", STALL);

    let report = harness.services.reminders.tick().await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(harness.messenger.sent_to("2").len(), 1);

    let today = chrono::NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
    assert!(!harness.services.reminders.already_sent("1", PrayerName::Fajr, today));
    assert!(harness.services.reminders.already_sent("2", PrayerName::Fajr, today));
}

#[tokio::test(start_paused = true)]
async fn test_stalled_dua_recipient_is_counted() {
    let harness = Harness::at(8, 0);
    let item = DevotionalItem::new("A", None, harness.clock.current_time());
    harness.store.insert_devotional_item(&item).await.unwrap();
    for id in ["1", "2"] {
        harness
            .store
            .put_subscriber(Subscriber::new(id).with_dua_time("08:00"))
            .await;
    }
    harness.messenger.stall_for("2", STALL);

    let slot = "08:00".parse().unwrap();
    let report = harness.services.duas.dispatch_slot(&slot).await.unwrap();

    assert_eq!(report, DeliveryReport { delivered: 1, total: 2 });
    assert_eq!(harness.messenger.sent_to("1").len(), 1);
}
