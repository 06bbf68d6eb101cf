//! Services module for the prayer reminder bot
//!
//! Contains all business logic. [`BotContext`] carries the shared
//! collaborators, [`BotServices`] wires the services on top of them.

pub mod broadcast_service;
pub mod delivery;
pub mod dispatcher;
pub mod dua_dispatch_service;
pub mod dua_rotation;
pub mod interaction_service;
pub mod region_service;
pub mod reminder_service;
pub mod replies;
pub mod scheduling_service;
pub mod session_service;
pub mod task_handlers;
pub mod time_provider;

use std::sync::Arc;

use chrono_tz::Tz;

use crate::database::ContentStore;
use crate::messenger::Messenger;
use crate::models::{AdminSet, DuaSlots};
use crate::prayer_times::PrayerTimeProvider;

// Re-export commonly used services
pub use broadcast_service::{BroadcastReport, BroadcastService};
pub use delivery::{with_deadline, DeliveryReport, DeliverySettings};
pub use dispatcher::{ConversationDispatcher, EventHandler};
pub use dua_dispatch_service::DuaDispatchService;
pub use interaction_service::InteractionService;
pub use region_service::RegionService;
pub use reminder_service::{ReminderService, TickReport};
pub use scheduling_service::{SchedulingError, SchedulingService, TaskContext, TaskHandler};
pub use session_service::{SessionService, SessionStore};
pub use time_provider::{MockTimeProvider, SystemTimeProvider, TimeProvider};

/// Shared collaborators every service draws from
#[derive(Clone)]
pub struct BotContext {
    pub store: Arc<dyn ContentStore>,
    pub provider: Arc<dyn PrayerTimeProvider>,
    pub messenger: Arc<dyn Messenger>,
    pub regions: Arc<RegionService>,
    pub dua_slots: DuaSlots,
    pub admins: Arc<AdminSet>,
    pub time_provider: Arc<dyn TimeProvider>,
    /// Timezone for dua slots and for "today" in the rotation
    pub reference_timezone: Tz,
    pub settings: DeliverySettings,
}

/// The fully wired service graph
#[derive(Clone)]
pub struct BotServices {
    pub reminders: Arc<ReminderService>,
    pub duas: Arc<DuaDispatchService>,
    pub broadcasts: Arc<BroadcastService>,
    pub sessions: Arc<SessionService>,
    pub interactions: Arc<InteractionService>,
    pub dispatcher: ConversationDispatcher,
}

impl BotServices {
    pub fn build(context: &BotContext, bot_username: Option<String>) -> Self {
        let ctx = context.clone();

        let reminders = Arc::new(ReminderService::new(
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.provider),
            Arc::clone(&ctx.messenger),
            Arc::clone(&ctx.regions),
            Arc::clone(&ctx.time_provider),
            ctx.settings,
        ));

        let duas = Arc::new(DuaDispatchService::new(
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.messenger),
            Arc::clone(&ctx.time_provider),
            ctx.reference_timezone,
            ctx.settings,
        ));

        let broadcasts = Arc::new(BroadcastService::new(
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.messenger),
            ctx.settings,
        ));

        let sessions = Arc::new(SessionService::new(
            SessionStore::new(),
            Arc::clone(&ctx.store),
            Arc::clone(&ctx.messenger),
            Arc::clone(&broadcasts),
            Arc::clone(&ctx.time_provider),
            Arc::clone(&ctx.admins),
            ctx.settings,
        ));

        let interactions =
            Arc::new(InteractionService::new(ctx, Arc::clone(&sessions)).with_bot_username(bot_username));
        let dispatcher = ConversationDispatcher::new(interactions.clone());

        Self {
            reminders,
            duas,
            broadcasts,
            sessions,
            interactions,
            dispatcher,
        }
    }
}
