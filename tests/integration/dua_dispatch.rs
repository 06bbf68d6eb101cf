//! Daily dua delivery integration tests

use chrono::{TimeZone, Utc};
use chrono_tz::Asia::Tashkent;
use crate::common::Harness;
use prayer_reminder_bot::database::ContentStore;
use prayer_reminder_bot::messenger::SentMessage;
use prayer_reminder_bot::models::{DevotionalItem, DuaSlot, Subscriber};
use prayer_reminder_bot::services::DeliveryReport;

async fn seeded() -> Harness {
    let harness = Harness::at(8, 0);
    let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
    for (i, caption) in ["A", "B", "C"].into_iter().enumerate() {
        let image = (caption == "C").then(|| "img-c".to_string());
        let item = DevotionalItem::new(caption, image, base + chrono::Duration::minutes(i as i64));
        harness.store.insert_devotional_item(&item).await.unwrap();
    }
    harness
        .store
        .put_subscriber(Subscriber::new("1").with_dua_time("08:00"))
        .await;
    harness
        .store
        .put_subscriber(Subscriber::new("2").with_dua_time("20:00"))
        .await;
    harness.store.put_subscriber(Subscriber::new("3")).await;
    harness
}

fn slot(raw: &str) -> DuaSlot {
    raw.parse().unwrap()
}

#[tokio::test]
async fn test_only_slot_subscribers_receive_todays_item() {
    let harness = seeded().await;

    let report = harness.services.duas.dispatch_slot(&slot("08:00")).await.unwrap();

    assert_eq!(report, DeliveryReport { delivered: 1, total: 1 });
    // 14 March: (14 - 1) mod 3 = 1
    assert_eq!(harness.messenger.sent_to("1")[0].body(), Some("B"));
    assert!(harness.messenger.sent_to("2").is_empty());
    assert!(harness.messenger.sent_to("3").is_empty());
}

#[tokio::test]
async fn test_day_is_taken_in_reference_timezone() {
    let harness = seeded().await;
    // 00:30 in Tashkent is still the 14th in UTC
    let local = Tashkent.with_ymd_and_hms(2025, 3, 15, 0, 30, 0).unwrap();
    harness.clock.set_time(local.with_timezone(&Utc));

    harness.services.duas.dispatch_slot(&slot("08:00")).await.unwrap();

    assert_eq!(
        harness.messenger.sent_to("1"),
        vec![SentMessage::Photo {
            recipient: "1".into(),
            image: "img-c".into(),
            caption: "C".into(),
        }]
    );
}

#[tokio::test]
async fn test_slot_without_subscribers_sends_nothing() {
    let harness = seeded().await;

    let report = harness.services.duas.dispatch_slot(&slot("12:00")).await.unwrap();

    assert_eq!(report, DeliveryReport::default());
    assert!(harness.messenger.sent().is_empty());
}

#[tokio::test]
async fn test_failing_recipient_is_counted() {
    let harness = seeded().await;
    harness
        .store
        .put_subscriber(Subscriber::new("4").with_dua_time("20:00"))
        .await;
    harness.messenger.fail_for("2");

    let report = harness.services.duas.dispatch_slot(&slot("20:00")).await.unwrap();

    assert_eq!(report, DeliveryReport { delivered: 1, total: 2 });
    assert_eq!(report.failed(), 1);
    assert_eq!(harness.messenger.sent_to("4").len(), 1);
}
