//! Inbound event handling
//!
//! Commands and button presses are answered here; plain messages go to the
//! session machine. Every button press deletes the menu it came from, is
//! acted on, then acknowledged.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, Instrument};

use crate::error::{BotResult, ConfigurationError};
use crate::logging::{log_delivery_failure, log_error};
use crate::messenger::InlineKeyboard;
use crate::models::{CallbackIntent, Command, InboundEvent, Region, Sender, Subscriber, SubscriberPatch};
use crate::services::delivery::with_deadline;
use crate::services::dispatcher::EventHandler;
use crate::services::replies;
use crate::services::session_service::SessionService;
use crate::services::BotContext;

const STATISTICS_FAILED: &str = "❌ Statistikani olishda xatolik yuz berdi.";

pub struct InteractionService {
    context: BotContext,
    sessions: Arc<SessionService>,
    bot_username: Option<String>,
}

impl InteractionService {
    pub fn new(context: BotContext, sessions: Arc<SessionService>) -> Self {
        Self {
            context,
            sessions,
            bot_username: None,
        }
    }

    /// Handle shown in the library page heading
    pub fn with_bot_username(mut self, username: Option<String>) -> Self {
        self.bot_username = username;
        self
    }

    /// Processes one inbound event. Failures are logged, never returned.
    pub async fn process(&self, event: InboundEvent) {
        let kind = match &event {
            InboundEvent::Command { .. } => "command",
            InboundEvent::Callback { .. } => "callback",
            InboundEvent::Message { .. } => "message",
        };
        let span = crate::conversation_span!(event.conversation(), kind);

        async move {
            match event {
                InboundEvent::Command {
                    conversation,
                    sender,
                    command,
                } => self.on_command(&conversation, &sender, command).await,
                InboundEvent::Callback {
                    conversation,
                    sender,
                    callback_id,
                    message_id,
                    intent,
                } => {
                    self.on_callback(&conversation, &sender, &callback_id, message_id, intent)
                        .await
                }
                InboundEvent::Message {
                    conversation,
                    sender,
                    content,
                } => match self.sessions.handle_message(&conversation, &sender, &content).await {
                    Ok(true) => {}
                    Ok(false) => debug!(kind = content.kind(), "Message outside any session, ignoring"),
                    Err(error) => log_error(&error, "session_message", Some(&conversation)),
                },
            }
        }
        .instrument(span)
        .await
    }

    async fn on_command(&self, conversation: &str, sender: &Sender, command: Command) {
        match command {
            Command::Start => {
                self.reply_with_menu(conversation, &replies::greeting(sender), &replies::main_menu())
                    .await
            }
            Command::Panel => {
                if !self.sessions.is_admin(sender) {
                    debug!(sender = %sender.id, "Non-admin asked for the panel, ignoring");
                    return;
                }
                match self.statistics().await {
                    Ok(text) => self.reply_with_menu(conversation, &text, &replies::admin_menu()).await,
                    Err(error) => {
                        log_error(&error, "panel_statistics", Some(conversation));
                        self.reply(conversation, STATISTICS_FAILED).await;
                    }
                }
            }
        }
    }

    async fn on_callback(
        &self,
        conversation: &str,
        sender: &Sender,
        callback_id: &str,
        message_id: Option<i64>,
        intent: CallbackIntent,
    ) {
        let timeout = self.context.settings.external_timeout;
        let messenger = &self.context.messenger;

        if let Some(message_id) = message_id {
            if let Err(error) = with_deadline(
                "delete_message",
                timeout,
                messenger.delete_message(conversation, message_id),
            )
            .await
            {
                debug!(error = %error, "Could not delete menu message");
            }
        }

        match intent {
            CallbackIntent::PrayTimes => {
                let keyboard = replies::region_menu(&self.context.regions);
                self.reply_with_menu(conversation, replies::REGION_PROMPT, &keyboard).await;
            }
            CallbackIntent::SelectRegion(key) => self.select_region(conversation, sender, &key).await,
            CallbackIntent::DuaMenu => {
                let keyboard = replies::dua_time_menu(&self.context.dua_slots);
                self.reply_with_menu(conversation, replies::DUA_TIME_PROMPT, &keyboard).await;
            }
            CallbackIntent::SelectDuaTime(raw) => self.select_dua_time(conversation, sender, &raw).await,
            CallbackIntent::Library => {
                let text = replies::library(self.bot_username.as_deref());
                self.reply_with_menu(conversation, &text, &replies::library_menu()).await;
            }
            CallbackIntent::SendFeedback => self.sessions.begin_feedback(conversation).await,
            CallbackIntent::AdminAddDua => self.sessions.begin_dua_intake(conversation, sender).await,
            CallbackIntent::AdminBroadcast => self.sessions.begin_broadcast(conversation, sender).await,
            CallbackIntent::Unknown(raw) => debug!(data = %raw, "Unknown callback payload"),
        }

        if let Err(error) = with_deadline("acknowledge", timeout, messenger.acknowledge(callback_id)).await {
            debug!(error = %error, "Could not acknowledge callback");
        }
    }

    async fn select_region(&self, conversation: &str, sender: &Sender, key: &str) {
        let region = match self.context.regions.resolve(key) {
            Ok(region) => region,
            Err(error) => {
                debug!(error = %error, "Rejected region selection");
                self.reply(conversation, replies::UNKNOWN_REGION).await;
                return;
            }
        };

        let patch = SubscriberPatch::profile(sender.name.clone(), sender.username.clone()).region(key);
        if let Err(error) = self.upsert(conversation, &patch).await {
            log_error(&error, "save_region", Some(conversation));
        }

        self.send_prayer_times(conversation, region).await;
        self.reply_with_menu(conversation, &replies::region_saved(&region.label), &replies::main_menu())
            .await;
    }

    async fn send_prayer_times(&self, conversation: &str, region: &Region) {
        let timezone = self
            .context
            .regions
            .timezone_for(&region.key)
            .unwrap_or(self.context.reference_timezone);
        let today = self.context.time_provider.today_in_timezone(timezone);

        let timings = with_deadline(
            "resolve_prayer_times",
            self.context.settings.external_timeout,
            self.context.provider.resolve(&region.descriptor, today),
        )
        .await;

        match timings {
            Ok(timings) => {
                let date_label = timings
                    .date_label
                    .clone()
                    .unwrap_or_else(|| today.format("%d.%m.%Y").to_string());
                self.reply(conversation, &replies::prayer_times(region, &date_label, &timings))
                    .await;
            }
            Err(error) => {
                log_error(&error, "prayer_times", Some(conversation));
                self.reply(conversation, replies::PRAYER_TIMES_FAILED).await;
            }
        }
    }

    async fn select_dua_time(&self, conversation: &str, sender: &Sender, raw: &str) {
        let slot = match self.context.dua_slots.resolve(raw).map_err(ConfigurationError::from) {
            Ok(slot) => slot,
            Err(error) => {
                debug!(error = %error, "Rejected dua time selection");
                self.reply(conversation, replies::UNKNOWN_DUA_TIME).await;
                return;
            }
        };

        let patch = SubscriberPatch::profile(sender.name.clone(), sender.username.clone()).dua_time(slot.to_string());
        match self.upsert(conversation, &patch).await {
            Ok(()) => {
                let text = replies::dua_time_saved(&slot.to_string());
                self.reply_with_menu(conversation, &text, &replies::main_menu()).await;
            }
            Err(error) => {
                log_error(&error, "save_dua_time", Some(conversation));
                self.reply(conversation, replies::DUA_TIME_SAVE_FAILED).await;
            }
        }
    }

    async fn upsert(&self, subscriber: &str, patch: &SubscriberPatch) -> BotResult<()> {
        with_deadline(
            "upsert_subscriber",
            self.context.settings.external_timeout,
            self.context.store.upsert_subscriber(subscriber, patch),
        )
        .await
    }

    async fn statistics(&self) -> BotResult<String> {
        let subscribers = with_deadline(
            "list_all_subscribers",
            self.context.settings.external_timeout,
            self.context.store.list_all_subscribers(),
        )
        .await?;

        let (by_region, by_slot) = self.tally(&subscribers);
        Ok(replies::statistics(subscribers.len(), &by_region, &by_slot))
    }

    /// Counts per region label and per dua slot, in menu order. Values outside
    /// the configured tables are listed last under their raw key.
    fn tally(&self, subscribers: &[Subscriber]) -> (Vec<(String, usize)>, Vec<(String, usize)>) {
        let mut regions: HashMap<&str, usize> = HashMap::new();
        let mut slots: HashMap<&str, usize> = HashMap::new();
        for subscriber in subscribers {
            if let Some(region) = subscriber.region.as_deref().filter(|r| !r.is_empty()) {
                *regions.entry(region).or_default() += 1;
            }
            if let Some(slot) = subscriber.dua_time.as_deref() {
                *slots.entry(slot).or_default() += 1;
            }
        }

        let mut by_region = Vec::new();
        for region in self.context.regions.regions() {
            if let Some(count) = regions.remove(region.key.as_str()) {
                by_region.push((region.label.clone(), count));
            }
        }
        let mut leftovers: Vec<(String, usize)> = regions.into_iter().map(|(k, c)| (k.to_string(), c)).collect();
        leftovers.sort();
        by_region.extend(leftovers);

        let mut by_slot = Vec::new();
        for slot in self.context.dua_slots.iter() {
            if let Some(count) = slots.remove(slot.to_string().as_str()) {
                by_slot.push((slot.to_string(), count));
            }
        }
        let mut leftovers: Vec<(String, usize)> = slots.into_iter().map(|(k, c)| (k.to_string(), c)).collect();
        leftovers.sort();
        by_slot.extend(leftovers);

        (by_region, by_slot)
    }

    async fn reply(&self, conversation: &str, text: &str) {
        let sent = with_deadline(
            "reply",
            self.context.settings.external_timeout,
            self.context.messenger.send_text(conversation, text),
        )
        .await;
        if let Err(error) = sent {
            log_delivery_failure(conversation, "reply", &error);
        }
    }

    async fn reply_with_menu(&self, conversation: &str, text: &str, keyboard: &InlineKeyboard) {
        let sent = with_deadline(
            "reply_with_menu",
            self.context.settings.external_timeout,
            self.context.messenger.send_text_with_keyboard(conversation, text, keyboard),
        )
        .await;
        if let Err(error) = sent {
            log_delivery_failure(conversation, "reply_with_menu", &error);
        }
    }
}

#[async_trait]
impl EventHandler for InteractionService {
    async fn handle(&self, event: InboundEvent) {
        self.process(event).await
    }
}
