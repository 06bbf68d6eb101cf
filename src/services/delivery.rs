//! Delivery settings and deadlines shared by every fan-out
//!
//! Every call to a collaborator (store, provider, messenger) goes through
//! [`with_deadline`] so one unresponsive dependency cannot stall a loop.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::error::{BotError, BotResult};

/// Limits applied to outbound work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverySettings {
    /// Upper bound for a single external call
    pub external_timeout: Duration,
    /// Concurrent sends within one scheduled fan-out
    pub concurrency: usize,
    /// Pause between two broadcast sends
    pub broadcast_delay: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            external_timeout: Duration::from_secs(10),
            concurrency: 8,
            broadcast_delay: Duration::from_millis(50),
        }
    }
}

impl DeliverySettings {
    /// Concurrency clamped to at least one worker
    pub fn workers(&self) -> usize {
        self.concurrency.max(1)
    }
}

/// Runs `future` with a timeout. Expiry becomes [`BotError::Timeout`].
pub async fn with_deadline<T, E, F>(operation: &str, limit: Duration, future: F) -> BotResult<T>
where
    F: Future<Output = Result<T, E>>,
    BotError: From<E>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result.map_err(BotError::from),
        Err(_) => Err(BotError::timeout(operation, limit)),
    }
}

/// Aggregate result of a scheduled fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    pub total: usize,
}

impl DeliveryReport {
    pub fn failed(&self) -> usize {
        self.total.saturating_sub(self.delivered)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messenger::MessengerError;

    #[tokio::test]
    async fn test_deadline_passes_through_results() {
        let ok: BotResult<u8> = with_deadline("op", Duration::from_secs(1), async { Ok::<_, MessengerError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err: BotResult<u8> = with_deadline("op", Duration::from_secs(1), async {
            Err(MessengerError::Transport("down".into()))
        })
        .await;
        assert_eq!(err.unwrap_err().error_code(), "DeliveryError");
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_expiry_is_timeout() {
        let result: BotResult<()> = with_deadline("send_text", Duration::from_secs(10), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok::<_, MessengerError>(())
        })
        .await;

        let error = result.unwrap_err();
        assert_eq!(error.error_code(), "Timeout");
        assert!(error.is_per_recipient());
    }

    #[test]
    fn test_report_failures() {
        let report = DeliveryReport { delivered: 3, total: 5 };
        assert_eq!(report.failed(), 2);
    }
}
