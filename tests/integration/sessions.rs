//! Conversation session flows: dua intake, feedback and broadcast

use crate::common::{Harness, ADMIN, SECOND_ADMIN};
use prayer_reminder_bot::database::ContentStore;
use prayer_reminder_bot::messenger::SentMessage;
use prayer_reminder_bot::models::{CallbackIntent, InboundEvent, MessageContent, SessionStep, Sender, Subscriber};
use prayer_reminder_bot::services::replies;

fn photo(conversation: &str, file_id: &str) -> InboundEvent {
    InboundEvent::Message {
        conversation: conversation.to_string(),
        sender: Sender::new(conversation),
        content: MessageContent::Photo {
            file_id: file_id.to_string(),
            caption: None,
        },
    }
}

fn texts_to(harness: &Harness, recipient: &str) -> Vec<String> {
    harness
        .messenger
        .sent_to(recipient)
        .iter()
        .filter_map(|m| match m {
            SentMessage::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_dua_intake_text_only() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback(ADMIN, CallbackIntent::AdminAddDua))
        .await;
    interactions.process(InboundEvent::text(ADMIN, "Test dua")).await;

    let items = harness.store.list_devotional_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].caption, "Test dua");
    assert_eq!(items[0].image, None);

    let texts = texts_to(&harness, ADMIN);
    assert_eq!(
        texts,
        vec![
            replies::DUA_CONTENT_PROMPT.to_string(),
            "Test dua".to_string(),
            replies::DUA_SAVED.to_string()
        ]
    );
    assert!(harness.services.sessions.sessions().get(ADMIN).await.is_none());
}

#[tokio::test]
async fn test_dua_intake_with_image() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback(ADMIN, CallbackIntent::AdminAddDua))
        .await;
    interactions.process(photo(ADMIN, "img-1")).await;

    let session = harness.services.sessions.sessions().get(ADMIN).await.unwrap();
    assert_eq!(
        session.step,
        SessionStep::AwaitingDuaContent {
            staged_image: Some("img-1".into())
        }
    );

    interactions.process(InboundEvent::text(ADMIN, "Test dua")).await;

    let items = harness.store.list_devotional_items().await.unwrap();
    assert_eq!(items[0].image.as_deref(), Some("img-1"));
    assert!(harness.messenger.sent_to(ADMIN).contains(&SentMessage::Photo {
        recipient: ADMIN.into(),
        image: "img-1".into(),
        caption: "Test dua".into(),
    }));
    assert!(texts_to(&harness, ADMIN).contains(&replies::DUA_SAVED.to_string()));
    assert!(harness.services.sessions.sessions().get(ADMIN).await.is_none());
}

#[tokio::test]
async fn test_dua_intake_storage_failure_clears_session() {
    let harness = Harness::at(9, 0);
    harness.store.set_fail_writes(true);
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback(ADMIN, CallbackIntent::AdminAddDua))
        .await;
    interactions.process(InboundEvent::text(ADMIN, "Test dua")).await;

    assert!(texts_to(&harness, ADMIN).contains(&replies::DUA_SAVE_FAILED.to_string()));
    assert!(harness.services.sessions.sessions().get(ADMIN).await.is_none());
}

#[tokio::test]
async fn test_non_admin_cannot_start_admin_flows() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback("55", CallbackIntent::AdminAddDua))
        .await;
    interactions
        .process(InboundEvent::callback("55", CallbackIntent::AdminBroadcast))
        .await;

    assert!(texts_to(&harness, "55").is_empty());
    assert!(harness.services.sessions.sessions().get("55").await.is_none());
}

#[tokio::test]
async fn test_feedback_flow() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback("55", CallbackIntent::SendFeedback))
        .await;
    interactions.process(InboundEvent::text("55", "ok")).await;

    assert_eq!(
        texts_to(&harness, "55").last().map(String::as_str),
        Some(replies::FEEDBACK_TOO_SHORT)
    );
    assert!(harness.services.sessions.sessions().get("55").await.is_some());
    assert!(texts_to(&harness, ADMIN).is_empty());

    interactions
        .process(InboundEvent::text("55", "Please add Friday reminder"))
        .await;

    for admin in [ADMIN, SECOND_ADMIN] {
        let forwarded = texts_to(&harness, admin);
        assert_eq!(forwarded.len(), 1, "admin {admin}");
        assert!(forwarded[0].contains("Please add Friday reminder"));
    }
    assert_eq!(
        texts_to(&harness, "55").last().map(String::as_str),
        Some(replies::FEEDBACK_RECEIVED)
    );
    assert!(harness.services.sessions.sessions().get("55").await.is_none());
}

#[tokio::test]
async fn test_broadcast_isolates_failing_recipient() {
    let harness = Harness::at(9, 0);
    for id in 1..=5 {
        harness.store.put_subscriber(Subscriber::new(id.to_string())).await;
    }
    harness.messenger.fail_for("3");
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback(ADMIN, CallbackIntent::AdminBroadcast))
        .await;
    interactions.process(InboundEvent::text(ADMIN, "Eid Mubarak")).await;

    for id in ["1", "2", "4", "5"] {
        assert_eq!(texts_to(&harness, id), vec!["Eid Mubarak".to_string()]);
    }
    assert!(texts_to(&harness, "3").is_empty());

    let summary = texts_to(&harness, ADMIN).pop().unwrap();
    assert_eq!(
        summary,
        "✅ E’lon 4 foydalanuvchiga muvaffaqiyatli yuborildi.\n❌ Xatolar: 1 ta."
    );
    assert!(harness.services.sessions.sessions().get(ADMIN).await.is_none());
}

#[tokio::test]
async fn test_message_without_session_is_ignored() {
    let harness = Harness::at(9, 0);

    harness
        .services
        .interactions
        .process(InboundEvent::text("55", "hello?"))
        .await;

    assert!(harness.messenger.sent().is_empty());
}

#[tokio::test]
async fn test_starting_a_flow_replaces_the_previous_one() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback(ADMIN, CallbackIntent::SendFeedback))
        .await;
    interactions
        .process(InboundEvent::callback(ADMIN, CallbackIntent::AdminBroadcast))
        .await;

    let session = harness.services.sessions.sessions().get(ADMIN).await.unwrap();
    assert_eq!(session.step, SessionStep::AwaitingBroadcastContent);
}

#[tokio::test]
async fn test_session_entries_do_not_outlive_their_flow() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    for id in 1..=50 {
        interactions.process(InboundEvent::text(id.to_string(), "salom")).await;
    }
    assert_eq!(harness.services.sessions.sessions().len(), 0);

    interactions
        .process(InboundEvent::callback("55", CallbackIntent::SendFeedback))
        .await;
    interactions.process(InboundEvent::text("55", "ok")).await;
    assert_eq!(harness.services.sessions.sessions().len(), 1);

    interactions
        .process(InboundEvent::text("55", "Please add Friday reminder"))
        .await;
    assert_eq!(harness.services.sessions.sessions().len(), 0);

    interactions
        .process(InboundEvent::callback(ADMIN, CallbackIntent::AdminAddDua))
        .await;
    interactions.process(InboundEvent::text(ADMIN, "Test dua")).await;
    assert!(harness.services.sessions.sessions().is_empty());
}

#[tokio::test]
async fn test_feedback_is_measured_and_forwarded_as_sent() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    interactions
        .process(InboundEvent::callback("55", CallbackIntent::SendFeedback))
        .await;
    interactions.process(InboundEvent::text("55", " ok")).await;

    let forwarded = texts_to(&harness, ADMIN);
    assert_eq!(forwarded.len(), 1);
    assert!(forwarded[0].contains("\n\n ok\n\n"));
    assert!(harness.services.sessions.sessions().get("55").await.is_none());
}
