//! Webhook endpoint
//!
//! Telegram posts every update to `/webhook/{token}`. Updates are always
//! acknowledged quickly; processing happens on the conversation workers.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use tower_http::trace::TraceLayer;
use tracing::{debug, warn};

use super::update::Update;
use crate::error::{BotError, BotResult};
use crate::services::ConversationDispatcher;

#[derive(Clone)]
pub struct WebhookState {
    token: Arc<str>,
    dispatcher: ConversationDispatcher,
}

impl WebhookState {
    pub fn new(token: &str, dispatcher: ConversationDispatcher) -> Self {
        Self {
            token: Arc::from(token),
            dispatcher,
        }
    }
}

/// Create the webhook router
pub fn create_router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook/:token", post(receive_update))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Accept one update
pub async fn receive_update(
    State(state): State<WebhookState>,
    Path(token): Path<String>,
    body: Bytes,
) -> BotResult<StatusCode> {
    if token.as_str() != &*state.token {
        warn!("Webhook called with a wrong token");
        return Err(BotError::NotFound("webhook".to_string()));
    }

    let update: Update = match serde_json::from_slice(&body) {
        Ok(update) => update,
        Err(e) => {
            warn!(error = %e, "Dropping unparseable update");
            return Ok(StatusCode::OK);
        }
    };

    let update_id = update.update_id;
    match update.into_event() {
        Some(event) => state.dispatcher.dispatch(event),
        None => debug!(update_id, "Update carries nothing to handle"),
    }
    Ok(StatusCode::OK)
}
