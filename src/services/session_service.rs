//! Conversation sessions
//!
//! [`SessionStore`] keeps at most one session per conversation id, each behind
//! its own async mutex. [`SessionService`] drives the three multi-step flows:
//!
//! | step                       | input            | effect                                          |
//! |----------------------------|------------------|-------------------------------------------------|
//! | AwaitingDuaContent         | photo            | stage image, stay                               |
//! | AwaitingDuaContent         | text             | persist item, echo, clear, confirm              |
//! | AwaitingBroadcastContent   | any message      | broadcast, clear, report                        |
//! | AwaitingFeedback           | text, 3+ chars   | forward to admins, clear, confirm               |
//! | AwaitingFeedback           | anything else    | re-prompt, stay                                 |
//!
//! Starting a flow replaces whatever session the conversation had.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use crate::database::ContentStore;
use crate::error::BotResult;
use crate::logging::{log_delivery_failure, log_error, log_session_transition};
use crate::messenger::Messenger;
use crate::models::{AdminSet, ConversationSession, DevotionalItem, MessageContent, Sender, SessionStep};
use crate::services::broadcast_service::BroadcastService;
use crate::services::delivery::{with_deadline, DeliverySettings};
use crate::services::replies;
use crate::services::time_provider::TimeProvider;

/// Minimum feedback length in characters
pub const MIN_FEEDBACK_CHARS: usize = 3;

type SessionSlot = Arc<Mutex<Option<ConversationSession>>>;

/// Per-conversation session map with per-key locking
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    sessions: Arc<DashMap<String, SessionSlot>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, conversation: &str) -> SessionSlot {
        Arc::clone(self.sessions.entry(conversation.to_string()).or_default().value())
    }

    fn existing(&self, conversation: &str) -> Option<SessionSlot> {
        self.sessions.get(conversation).map(|entry| Arc::clone(entry.value()))
    }

    /// Drops the conversation's entry once its session is gone and nobody else
    /// holds the slot
    fn prune(&self, conversation: &str) {
        self.sessions.remove_if(conversation, |_, slot| {
            Arc::strong_count(slot) == 1 && slot.try_lock().is_ok_and(|guard| guard.is_none())
        });
    }

    /// Snapshot of a conversation's session
    pub async fn get(&self, conversation: &str) -> Option<ConversationSession> {
        let slot = self.existing(conversation)?;
        let guard = slot.lock().await;
        guard.clone()
    }

    /// Replaces the conversation's session, returning the previous one
    pub async fn replace(&self, conversation: &str, session: ConversationSession) -> Option<ConversationSession> {
        let slot = self.slot(conversation);
        let mut guard = slot.lock().await;
        guard.replace(session)
    }

    /// Number of conversations with a map entry
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Clears sessions started more than `max_age` before `now` and drops empty
    /// entries. Sessions currently being processed are left alone.
    pub fn evict_idle(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> usize {
        let mut evicted = 0;
        self.sessions.retain(|conversation, slot| {
            // Someone holds a clone and may be about to lock it
            let shared = Arc::strong_count(slot) > 1;
            let Ok(mut guard) = slot.try_lock() else {
                return true;
            };
            if guard.as_ref().is_some_and(|s| s.is_older_than(now, max_age)) {
                let expired = guard.take();
                log_session_transition(conversation, expired.as_ref().map(|s| s.step_name()), None);
                evicted += 1;
            }
            guard.is_some() || shared
        });
        evicted
    }
}

/// Drives the feedback, dua intake and broadcast flows
pub struct SessionService {
    sessions: SessionStore,
    store: Arc<dyn ContentStore>,
    messenger: Arc<dyn Messenger>,
    broadcaster: Arc<BroadcastService>,
    time_provider: Arc<dyn TimeProvider>,
    admins: Arc<AdminSet>,
    settings: DeliverySettings,
}

impl SessionService {
    pub fn new(
        sessions: SessionStore,
        store: Arc<dyn ContentStore>,
        messenger: Arc<dyn Messenger>,
        broadcaster: Arc<BroadcastService>,
        time_provider: Arc<dyn TimeProvider>,
        admins: Arc<AdminSet>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            sessions,
            store,
            messenger,
            broadcaster,
            time_provider,
            admins,
            settings,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn is_admin(&self, sender: &Sender) -> bool {
        self.admins.contains(&sender.id)
    }

    /// Any user may start the feedback flow
    pub async fn begin_feedback(&self, conversation: &str) {
        let session = ConversationSession::awaiting_feedback(self.time_provider.now_utc());
        self.begin(conversation, session, replies::FEEDBACK_PROMPT).await;
    }

    /// Starts dua intake; ignored for non-admins
    pub async fn begin_dua_intake(&self, conversation: &str, sender: &Sender) {
        if !self.is_admin(sender) {
            debug!(sender = %sender.id, "Non-admin asked to add a dua, ignoring");
            return;
        }
        let session = ConversationSession::awaiting_dua_content(self.time_provider.now_utc());
        self.begin(conversation, session, replies::DUA_CONTENT_PROMPT).await;
    }

    /// Starts a broadcast; ignored for non-admins
    pub async fn begin_broadcast(&self, conversation: &str, sender: &Sender) {
        if !self.is_admin(sender) {
            debug!(sender = %sender.id, "Non-admin asked to broadcast, ignoring");
            return;
        }
        let session = ConversationSession::awaiting_broadcast(self.time_provider.now_utc());
        self.begin(conversation, session, replies::BROADCAST_PROMPT).await;
    }

    async fn begin(&self, conversation: &str, session: ConversationSession, prompt: &str) {
        let to = session.step_name().to_string();
        let previous = self.sessions.replace(conversation, session).await;
        log_session_transition(conversation, previous.as_ref().map(|s| s.step_name()), Some(&to));
        self.reply(conversation, prompt).await;
    }

    /// Feeds a non-command message to the conversation's session. Returns
    /// whether a session consumed it.
    pub async fn handle_message(&self, conversation: &str, sender: &Sender, content: &MessageContent) -> BotResult<bool> {
        let Some(slot) = self.sessions.existing(conversation) else {
            return Ok(false);
        };

        let consumed = {
            let mut guard = slot.lock().await;
            self.advance(conversation, sender, content, &mut guard).await
        };

        drop(slot);
        self.sessions.prune(conversation);
        consumed
    }

    async fn advance(
        &self,
        conversation: &str,
        sender: &Sender,
        content: &MessageContent,
        guard: &mut Option<ConversationSession>,
    ) -> BotResult<bool> {
        let Some(step) = guard.as_ref().map(|s| s.step.clone()) else {
            return Ok(false);
        };

        match step {
            SessionStep::AwaitingDuaContent { staged_image } => match content {
                MessageContent::Photo { file_id, .. } => {
                    if let Some(session) = guard.as_mut() {
                        session.step = SessionStep::AwaitingDuaContent {
                            staged_image: Some(file_id.clone()),
                        };
                    }
                    debug!(conversation = %conversation, "Dua image staged");
                    self.reply(conversation, replies::DUA_IMAGE_STAGED).await;
                    Ok(true)
                }
                MessageContent::Text(text) => {
                    let item = DevotionalItem::new(text.clone(), staged_image, self.time_provider.now_utc());
                    let stored = with_deadline(
                        "insert_devotional_item",
                        self.settings.external_timeout,
                        self.store.insert_devotional_item(&item),
                    )
                    .await;

                    match stored {
                        Ok(()) => {
                            self.echo(conversation, &item).await;
                            self.clear(conversation, guard);
                            self.reply(conversation, replies::DUA_SAVED).await;
                        }
                        Err(error) => {
                            log_error(&error, "dua_intake", Some(conversation));
                            self.clear(conversation, guard);
                            self.reply(conversation, replies::DUA_SAVE_FAILED).await;
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },

            SessionStep::AwaitingBroadcastContent => {
                let outcome = self.broadcaster.broadcast(content).await;
                self.clear(conversation, guard);
                match outcome {
                    Ok(report) => self.reply(conversation, &report.summary()).await,
                    Err(error) => {
                        log_error(&error, "broadcast", Some(conversation));
                        self.reply(conversation, replies::BROADCAST_FAILED).await;
                    }
                }
                Ok(true)
            }

            SessionStep::AwaitingFeedback => {
                let feedback = content
                    .text()
                    .filter(|text| text.chars().count() >= MIN_FEEDBACK_CHARS);

                match feedback {
                    Some(text) => {
                        self.forward_feedback(text, sender).await;
                        self.clear(conversation, guard);
                        self.reply(conversation, replies::FEEDBACK_RECEIVED).await;
                    }
                    None => self.reply(conversation, replies::FEEDBACK_TOO_SHORT).await,
                }
                Ok(true)
            }
        }
    }

    fn clear(&self, conversation: &str, session: &mut Option<ConversationSession>) {
        if let Some(previous) = session.take() {
            log_session_transition(conversation, Some(previous.step_name()), None);
        }
    }

    async fn echo(&self, conversation: &str, item: &DevotionalItem) {
        let timeout = self.settings.external_timeout;
        let echoed = match &item.image {
            Some(image) => {
                with_deadline("echo_dua", timeout, self.messenger.send_photo(conversation, image, &item.caption)).await
            }
            None => with_deadline("echo_dua", timeout, self.messenger.send_text(conversation, &item.caption)).await,
        };
        if let Err(error) = echoed {
            log_delivery_failure(conversation, "dua_echo", &error);
        }
    }

    async fn forward_feedback(&self, text: &str, sender: &Sender) {
        let message = replies::feedback_forward(text, sender);
        for admin in self.admins.iter() {
            let sent = with_deadline(
                "forward_feedback",
                self.settings.external_timeout,
                self.messenger.send_text(admin, &message),
            )
            .await;
            if let Err(error) = sent {
                log_delivery_failure(admin, "feedback_forward", &error);
            }
        }
    }

    async fn reply(&self, conversation: &str, text: &str) {
        let sent = with_deadline("reply", self.settings.external_timeout, self.messenger.send_text(conversation, text)).await;
        if let Err(error) = sent {
            log_delivery_failure(conversation, "session_reply", &error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 10, minute, 0).unwrap()
    }

    #[tokio::test]
    async fn test_replace_is_last_writer_wins() {
        let store = SessionStore::new();
        assert!(store.replace("1", ConversationSession::awaiting_feedback(at(0))).await.is_none());

        let previous = store.replace("1", ConversationSession::awaiting_broadcast(at(1))).await;
        assert_eq!(previous.unwrap().step, SessionStep::AwaitingFeedback);
        assert_eq!(store.get("1").await.unwrap().step, SessionStep::AwaitingBroadcastContent);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_idle_sessions() {
        let store = SessionStore::new();
        store.replace("old", ConversationSession::awaiting_feedback(at(0))).await;
        store.replace("new", ConversationSession::awaiting_feedback(at(50))).await;

        let evicted = store.evict_idle(at(55), chrono::Duration::minutes(30));

        assert_eq!(evicted, 1);
        assert!(store.get("old").await.is_none());
        assert!(store.get("new").await.is_some());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_evict_skips_locked_sessions() {
        let store = SessionStore::new();
        store.replace("busy", ConversationSession::awaiting_feedback(at(0))).await;

        let slot = store.slot("busy");
        let _guard = slot.lock().await;

        assert_eq!(store.evict_idle(at(59), chrono::Duration::minutes(1)), 0);
        assert_eq!(store.len(), 1);
    }
}
