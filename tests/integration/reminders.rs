//! Prayer reminder tick integration tests

use chrono_tz::Asia::Tashkent;
use crate::common::Harness;
use prayer_reminder_bot::messenger::SentMessage;
use prayer_reminder_bot::models::{PrayerName, Subscriber};

async fn seeded(hour: u32, minute: u32) -> Harness {
    let harness = Harness::at(hour, minute);
    harness
        .store
        .put_subscriber(Subscriber::new("1").with_region("toshkent"))
        .await;
    harness
}

#[tokio::test]
async fn test_reminder_fires_only_on_the_matching_minute() {
    for (minute, expected) in [(11, 0), (12, 1), (13, 0)] {
        let harness = seeded(5, minute).await;

        let report = harness.services.reminders.tick().await.unwrap();

        assert_eq!(report.delivered, expected, "at 05:{minute}");
        assert_eq!(harness.messenger.sent_to("1").len(), expected);
    }
}

#[tokio::test]
async fn test_fajr_reminder_text() {
    let harness = seeded(5, 12).await;
    harness.services.reminders.tick().await.unwrap();

    let sent = harness.messenger.sent_to("1");
    match &sent[0] {
        SentMessage::Text { text, .. } => assert!(text.contains("Bomdod")),
        other => panic!("unexpected delivery {other:?}"),
    }
}

#[tokio::test]
async fn test_repeated_tick_in_same_minute_sends_once() {
    let harness = seeded(5, 12).await;

    harness.services.reminders.tick().await.unwrap();
    harness.clock.advance_seconds(20);
    let second = harness.services.reminders.tick().await.unwrap();

    assert_eq!(second.delivered, 0);
    assert_eq!(second.duplicates, 1);
    assert_eq!(harness.messenger.sent_to("1").len(), 1);

    let today = harness.clock.current_time().with_timezone(&Tashkent).date_naive();
    assert!(harness.services.reminders.already_sent("1", PrayerName::Fajr, today));
}

#[tokio::test]
async fn test_failed_recipient_does_not_block_others() {
    let harness = seeded(12, 35).await;
    harness
        .store
        .put_subscriber(Subscriber::new("2").with_region("toshkent"))
        .await;
    harness.messenger.fail_for("1");

    let report = harness.services.reminders.tick().await.unwrap();

    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(harness.messenger.sent_to("2").len(), 1);
}

#[tokio::test]
async fn test_unknown_region_is_skipped() {
    let harness = seeded(5, 12).await;
    harness
        .store
        .put_subscriber(Subscriber::new("3").with_region("atlantis"))
        .await;

    let report = harness.services.reminders.tick().await.unwrap();

    assert_eq!(report.skipped, 1);
    assert_eq!(report.delivered, 1);
    assert!(harness.messenger.sent_to("3").is_empty());
}

#[tokio::test]
async fn test_provider_failure_skips_region() {
    let harness = seeded(5, 12).await;
    harness
        .store
        .put_subscriber(Subscriber::new("4").with_region("buxoro"))
        .await;

    let report = harness.services.reminders.tick().await.unwrap();

    // No canned timings for Buxoro
    assert_eq!(report.skipped, 1);
    assert_eq!(harness.messenger.sent_to("1").len(), 1);
}
