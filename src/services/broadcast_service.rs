//! Announcement broadcast
//!
//! Relays one admin-authored message to every subscriber, one at a time with a
//! fixed pause between sends to stay under the Bot API rate limit.

use std::sync::Arc;

use serde::Serialize;
use tracing::{warn, Instrument};

use crate::database::ContentStore;
use crate::error::{BotError, BotResult};
use crate::logging::{log_delivery_failure, log_fanout_summary};
use crate::messenger::Messenger;
use crate::models::MessageContent;
use crate::services::delivery::{with_deadline, DeliverySettings};

/// Counts reported back to the initiating administrator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcastReport {
    pub sent: usize,
    pub errors: usize,
}

impl BroadcastReport {
    /// Summary message for the administrator
    pub fn summary(&self) -> String {
        format!(
            "✅ E’lon {} foydalanuvchiga muvaffaqiyatli yuborildi.\n❌ Xatolar: {} ta.",
            self.sent, self.errors
        )
    }
}

pub struct BroadcastService {
    store: Arc<dyn ContentStore>,
    messenger: Arc<dyn Messenger>,
    settings: DeliverySettings,
}

impl BroadcastService {
    pub fn new(store: Arc<dyn ContentStore>, messenger: Arc<dyn Messenger>, settings: DeliverySettings) -> Self {
        Self {
            store,
            messenger,
            settings,
        }
    }

    /// Sends `content` to every subscriber. Per-recipient failures are counted,
    /// only a failure to list subscribers is returned as an error.
    pub async fn broadcast(&self, content: &MessageContent) -> BotResult<BroadcastReport> {
        let span = crate::fanout_span!("broadcast", content.kind());
        self.run_broadcast(content).instrument(span).await
    }

    async fn run_broadcast(&self, content: &MessageContent) -> BotResult<BroadcastReport> {
        let subscribers = with_deadline(
            "list_all_subscribers",
            self.settings.external_timeout,
            self.store.list_all_subscribers(),
        )
        .await?;

        let mut report = BroadcastReport::default();

        if let MessageContent::Unsupported { kind } = content {
            warn!(kind = %kind, recipients = subscribers.len(), "Unsupported broadcast media, nothing sent");
            report.errors = subscribers.len();
            return Ok(report);
        }

        for (position, subscriber) in subscribers.iter().enumerate() {
            if position > 0 && !self.settings.broadcast_delay.is_zero() {
                tokio::time::sleep(self.settings.broadcast_delay).await;
            }

            match self.send_one(&subscriber.id, content).await {
                Ok(()) => report.sent += 1,
                Err(error) => {
                    log_delivery_failure(&subscriber.id, "broadcast", &error);
                    report.errors += 1;
                }
            }
        }

        log_fanout_summary("broadcast", content.kind(), report.sent, subscribers.len(), report.errors);
        Ok(report)
    }

    async fn send_one(&self, recipient: &str, content: &MessageContent) -> BotResult<()> {
        let messenger = &self.messenger;
        let timeout = self.settings.external_timeout;
        let caption = |c: &Option<String>| c.clone().unwrap_or_default();

        match content {
            MessageContent::Text(text) => {
                with_deadline("broadcast_text", timeout, messenger.send_text(recipient, text)).await
            }
            MessageContent::Photo { file_id, caption: c } => {
                with_deadline("broadcast_photo", timeout, messenger.send_photo(recipient, file_id, &caption(c))).await
            }
            MessageContent::Video { file_id, caption: c } => {
                with_deadline("broadcast_video", timeout, messenger.send_video(recipient, file_id, &caption(c))).await
            }
            MessageContent::Audio { file_id, caption: c } => {
                with_deadline("broadcast_audio", timeout, messenger.send_audio(recipient, file_id, &caption(c))).await
            }
            MessageContent::Document { file_id, caption: c } => {
                with_deadline("broadcast_document", timeout, messenger.send_document(recipient, file_id, &caption(c)))
                    .await
            }
            MessageContent::Unsupported { kind } => Err(BotError::Internal(format!("cannot relay {kind}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::InMemoryContentStore;
    use crate::messenger::{RecordingMessenger, SentMessage};
    use crate::models::Subscriber;
    use std::time::Duration;

    async fn population(n: usize) -> InMemoryContentStore {
        let store = InMemoryContentStore::new();
        for i in 1..=n {
            store.put_subscriber(Subscriber::new(i.to_string())).await;
        }
        store
    }

    fn quick_settings() -> DeliverySettings {
        DeliverySettings {
            broadcast_delay: Duration::ZERO,
            ..DeliverySettings::default()
        }
    }

    #[tokio::test]
    async fn test_media_kind_selects_send_operation() {
        let store = population(1).await;
        let messenger = RecordingMessenger::new();
        let service = BroadcastService::new(Arc::new(store), Arc::new(messenger.clone()), quick_settings());

        let content = MessageContent::Video {
            file_id: "vid".into(),
            caption: None,
        };
        let report = service.broadcast(&content).await.unwrap();

        assert_eq!(report, BroadcastReport { sent: 1, errors: 0 });
        assert_eq!(
            messenger.sent(),
            vec![SentMessage::Video {
                recipient: "1".into(),
                file: "vid".into(),
                caption: String::new(),
            }]
        );
    }

    #[tokio::test]
    async fn test_unsupported_media_counts_errors_without_sending() {
        let store = population(3).await;
        let messenger = RecordingMessenger::new();
        let service = BroadcastService::new(Arc::new(store), Arc::new(messenger.clone()), quick_settings());

        let report = service
            .broadcast(&MessageContent::Unsupported { kind: "sticker".into() })
            .await
            .unwrap();

        assert_eq!(report, BroadcastReport { sent: 0, errors: 3 });
        assert!(messenger.attempts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_sends() {
        let store = population(3).await;
        let messenger = RecordingMessenger::new();
        let settings = DeliverySettings {
            broadcast_delay: Duration::from_millis(50),
            ..DeliverySettings::default()
        };
        let service = BroadcastService::new(Arc::new(store), Arc::new(messenger), settings);

        let started = tokio::time::Instant::now();
        service.broadcast(&MessageContent::Text("hi".into())).await.unwrap();

        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[test]
    fn test_summary_text() {
        let report = BroadcastReport { sent: 4, errors: 1 };
        assert_eq!(
            report.summary(),
            "✅ E’lon 4 foydalanuvchiga muvaffaqiyatli yuborildi.\n❌ Xatolar: 1 ta."
        );
    }
}
