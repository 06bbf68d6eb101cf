//! Webhook endpoint integration tests

use std::time::Duration;

use axum::http::StatusCode;
use axum_test::TestServer;
use crate::common::Harness;
use prayer_reminder_bot::api::{create_router, WebhookState};
use serde_json::json;

const TOKEN: &str = "123:secret";

fn server(harness: &Harness) -> TestServer {
    let app = create_router(WebhookState::new(TOKEN, harness.services.dispatcher.clone()));
    TestServer::new(app).unwrap()
}

async fn wait_for_deliveries(harness: &Harness, count: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while harness.messenger.sent().len() < count {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("deliveries did not arrive");
}

#[tokio::test]
async fn test_wrong_token_is_not_found() {
    let harness = Harness::at(9, 0);
    let server = server(&harness);

    let response = server
        .post("/webhook/nope")
        .json(&json!({ "update_id": 1 }))
        .await;

    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<serde_json::Value>()["error"], "NotFound");
}

#[tokio::test]
async fn test_unparseable_body_is_acknowledged() {
    let harness = Harness::at(9, 0);
    let server = server(&harness);

    let response = server.post(&format!("/webhook/{TOKEN}")).text("not json").await;

    response.assert_status_ok();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(harness.messenger.sent().is_empty());
}

#[tokio::test]
async fn test_start_update_is_dispatched() {
    let harness = Harness::at(9, 0);
    let server = server(&harness);

    let response = server
        .post(&format!("/webhook/{TOKEN}"))
        .json(&json!({
            "update_id": 10,
            "message": {
                "message_id": 1,
                "chat": { "id": 42 },
                "from": { "id": 42, "first_name": "Ali" },
                "text": "/start"
            }
        }))
        .await;

    response.assert_status_ok();
    wait_for_deliveries(&harness, 1).await;
    assert_eq!(harness.messenger.sent_to("42").len(), 1);
}

#[tokio::test]
async fn test_updates_of_one_chat_are_processed_in_order() {
    let harness = Harness::at(9, 0);
    let server = server(&harness);
    let url = format!("/webhook/{TOKEN}");

    let feedback_button = json!({
        "update_id": 20,
        "callback_query": {
            "id": "cb-1",
            "from": { "id": 42 },
            "message": { "message_id": 5, "chat": { "id": 42 } },
            "data": "send_admin"
        }
    });
    let feedback_text = json!({
        "update_id": 21,
        "message": {
            "message_id": 6,
            "chat": { "id": 42 },
            "from": { "id": 42 },
            "text": "Please add Friday reminder"
        }
    });

    server.post(&url).json(&feedback_button).await.assert_status_ok();
    server.post(&url).json(&feedback_text).await.assert_status_ok();

    // prompt, two forwards, confirmation, plus delete and acknowledge
    wait_for_deliveries(&harness, 6).await;
    assert_eq!(harness.messenger.sent_to(crate::common::ADMIN).len(), 1);
    assert_eq!(harness.messenger.sent_to(crate::common::SECOND_ADMIN).len(), 1);
}
