//! Per-conversation event dispatch
//!
//! Events for one conversation are handled strictly in arrival order by a
//! dedicated worker task; different conversations proceed concurrently. A
//! worker retires once its queue drains and is respawned on the next event.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::InboundEvent;

/// Consumer of inbound events
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle(&self, event: InboundEvent);
}

struct Worker {
    id: Uuid,
    tx: mpsc::UnboundedSender<InboundEvent>,
}

/// Routes events to one serial worker per conversation
#[derive(Clone)]
pub struct ConversationDispatcher {
    handler: Arc<dyn EventHandler>,
    workers: Arc<DashMap<String, Worker>>,
}

impl ConversationDispatcher {
    pub fn new(handler: Arc<dyn EventHandler>) -> Self {
        Self {
            handler,
            workers: Arc::new(DashMap::new()),
        }
    }

    /// Queues `event` behind earlier events of the same conversation.
    /// Returns immediately.
    pub fn dispatch(&self, event: InboundEvent) {
        let conversation = event.conversation().to_string();

        // The entry stays locked while sending so a retiring worker cannot
        // remove itself between our lookup and the send.
        match self.workers.entry(conversation.clone()) {
            Entry::Occupied(mut entry) => {
                if let Err(mpsc::error::SendError(event)) = entry.get().tx.send(event) {
                    warn!(conversation = %conversation, "Conversation worker gone, respawning");
                    entry.insert(self.spawn_worker(conversation, event));
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(self.spawn_worker(conversation, event));
            }
        }
    }

    /// Conversations with a live worker
    pub fn active_conversations(&self) -> usize {
        self.workers.len()
    }

    fn spawn_worker(&self, conversation: String, first: InboundEvent) -> Worker {
        let id = Uuid::new_v4();
        let (tx, mut rx) = mpsc::unbounded_channel();
        // The receiver is alive, this cannot fail
        let _ = tx.send(first);

        let handler = Arc::clone(&self.handler);
        let workers = Arc::clone(&self.workers);
        debug!(conversation = %conversation, worker = %id, "Conversation worker started");

        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handler.handle(event).await;

                let retired = workers
                    .remove_if(&conversation, |_, worker| worker.id == id && rx.is_empty())
                    .is_some();
                if retired {
                    debug!(conversation = %conversation, worker = %id, "Conversation worker retired");
                    break;
                }
            }
        });

        Worker { id, tx }
    }
}
