//! Daily dua delivery
//!
//! Fired once per configured slot. Subscribers who picked the slot receive the
//! item selected by the day's rotation, as a captioned photo when the item has
//! an image and as plain text otherwise.

use std::sync::Arc;

use chrono_tz::Tz;
use futures_util::stream::{self, StreamExt};
use tracing::{info, Instrument};

use crate::database::ContentStore;
use crate::error::BotResult;
use crate::logging::{log_delivery_failure, log_fanout_summary};
use crate::messenger::Messenger;
use crate::models::{DevotionalItem, DuaSlot};
use crate::services::delivery::{with_deadline, DeliveryReport, DeliverySettings};
use crate::services::dua_rotation::{select_for_date, NO_CONTENT_TEXT};
use crate::services::time_provider::TimeProvider;

pub struct DuaDispatchService {
    store: Arc<dyn ContentStore>,
    messenger: Arc<dyn Messenger>,
    time_provider: Arc<dyn TimeProvider>,
    /// Timezone "today" is taken in
    reference_timezone: Tz,
    settings: DeliverySettings,
}

impl DuaDispatchService {
    pub fn new(
        store: Arc<dyn ContentStore>,
        messenger: Arc<dyn Messenger>,
        time_provider: Arc<dyn TimeProvider>,
        reference_timezone: Tz,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            store,
            messenger,
            time_provider,
            reference_timezone,
            settings,
        }
    }

    /// Sends today's dua to every subscriber of `slot`
    pub async fn dispatch_slot(&self, slot: &DuaSlot) -> BotResult<DeliveryReport> {
        let span = crate::fanout_span!("dua", slot);
        self.run_dispatch(slot).instrument(span).await
    }

    async fn run_dispatch(&self, slot: &DuaSlot) -> BotResult<DeliveryReport> {
        let timeout = self.settings.external_timeout;

        let subscribers = with_deadline(
            "list_subscribers_with_dua_time",
            timeout,
            self.store.list_subscribers_with_dua_time(slot),
        )
        .await?;

        if subscribers.is_empty() {
            info!(slot = %slot, "No subscribers for dua slot");
            return Ok(DeliveryReport::default());
        }

        let items = with_deadline("list_devotional_items", timeout, self.store.list_devotional_items()).await?;
        let today = self.time_provider.today_in_timezone(self.reference_timezone);
        let selected = select_for_date(&items, today);

        info!(
            slot = %slot,
            date = %today,
            recipients = subscribers.len(),
            item = selected.map(|item| item.id.as_str()).unwrap_or("none"),
            "Sending daily dua"
        );

        let total = subscribers.len();
        let outcomes: Vec<bool> = stream::iter(subscribers)
            .map(|subscriber| async move {
                match self.send_one(&subscriber.id, selected).await {
                    Ok(()) => true,
                    Err(error) => {
                        log_delivery_failure(&subscriber.id, "daily_dua", &error);
                        false
                    }
                }
            })
            .buffer_unordered(self.settings.workers())
            .collect()
            .await;
        let delivered = outcomes.into_iter().filter(|ok| *ok).count();

        let report = DeliveryReport { delivered, total };
        tracing::Span::current().record("total", total);
        tracing::Span::current().record("delivered", delivered);
        log_fanout_summary("dua", &slot.to_string(), report.delivered, report.total, report.failed());

        Ok(report)
    }

    async fn send_one(&self, recipient: &str, item: Option<&DevotionalItem>) -> BotResult<()> {
        let timeout = self.settings.external_timeout;
        match item {
            Some(DevotionalItem {
                caption,
                image: Some(image),
                ..
            }) => with_deadline("send_dua_photo", timeout, self.messenger.send_photo(recipient, image, caption)).await,
            Some(item) => with_deadline("send_dua_text", timeout, self.messenger.send_text(recipient, &item.caption)).await,
            None => with_deadline("send_dua_placeholder", timeout, self.messenger.send_text(recipient, NO_CONTENT_TEXT)).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryContentStore;
    use crate::messenger::{RecordingMessenger, SentMessage};
    use crate::models::Subscriber;
    use crate::services::time_provider::MockTimeProvider;
    use chrono::{TimeZone, Utc};
    use chrono_tz::Asia::Tashkent;

    fn service(store: &InMemoryContentStore, messenger: &RecordingMessenger) -> DuaDispatchService {
        let clock = MockTimeProvider::at_local(Tashkent, 2025, 3, 2, 8, 0, 0).unwrap();
        DuaDispatchService::new(
            Arc::new(store.clone()),
            Arc::new(messenger.clone()),
            Arc::new(clock),
            Tashkent,
            DeliverySettings::default(),
        )
    }

    #[tokio::test]
    async fn test_empty_catalogue_sends_placeholder() {
        let store = InMemoryContentStore::new();
        store.put_subscriber(Subscriber::new("5").with_dua_time("08:00")).await;
        let messenger = RecordingMessenger::new();

        let slot: DuaSlot = "08:00".parse().unwrap();
        let report = service(&store, &messenger).dispatch_slot(&slot).await.unwrap();

        assert_eq!(report, DeliveryReport { delivered: 1, total: 1 });
        assert_eq!(messenger.sent_to("5")[0].body(), Some(NO_CONTENT_TEXT));
    }

    #[tokio::test]
    async fn test_second_item_selected_on_second_day() {
        let store = InMemoryContentStore::new();
        store.put_subscriber(Subscriber::new("5").with_dua_time("08:00")).await;
        let base = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        store
            .insert_devotional_item(&DevotionalItem::new("first", None, base))
            .await
            .unwrap();
        store
            .insert_devotional_item(&DevotionalItem::new(
                "second",
                Some("photo-2".into()),
                base + chrono::Duration::hours(1),
            ))
            .await
            .unwrap();
        let messenger = RecordingMessenger::new();

        let slot: DuaSlot = "08:00".parse().unwrap();
        service(&store, &messenger).dispatch_slot(&slot).await.unwrap();

        assert_eq!(
            messenger.sent_to("5"),
            vec![SentMessage::Photo {
                recipient: "5".into(),
                image: "photo-2".into(),
                caption: "second".into(),
            }]
        );
    }
}
