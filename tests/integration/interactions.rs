//! Command and button handling

use crate::common::{Harness, ADMIN};
use prayer_reminder_bot::messenger::SentMessage;
use prayer_reminder_bot::models::{CallbackIntent, Command, InboundEvent, Sender, Subscriber};
use prayer_reminder_bot::services::replies;

fn press(conversation: &str, intent: CallbackIntent) -> InboundEvent {
    InboundEvent::Callback {
        conversation: conversation.to_string(),
        sender: Sender::new(conversation).named("Ali"),
        callback_id: format!("cb-{conversation}"),
        message_id: Some(77),
        intent,
    }
}

fn command(conversation: &str, command: Command) -> InboundEvent {
    InboundEvent::Command {
        conversation: conversation.to_string(),
        sender: Sender::new(conversation).named("Ali"),
        command,
    }
}

fn texts_to(harness: &Harness, recipient: &str) -> Vec<String> {
    harness
        .messenger
        .sent_to(recipient)
        .into_iter()
        .filter_map(|m| match m {
            SentMessage::Text { text, .. } => Some(text),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_start_greets_with_main_menu() {
    let harness = Harness::at(9, 0);

    harness.services.interactions.process(command("42", Command::Start)).await;

    match &harness.messenger.sent_to("42")[0] {
        SentMessage::Text { text, keyboard, .. } => {
            assert!(text.starts_with("<b>Assalomu alaykum"));
            assert!(text.contains("Ali"));
            assert_eq!(keyboard.as_ref(), Some(&replies::main_menu()));
        }
        other => panic!("unexpected delivery {other:?}"),
    }
}

#[tokio::test]
async fn test_callback_deletes_menu_then_acknowledges() {
    let harness = Harness::at(9, 0);

    harness
        .services
        .interactions
        .process(press("42", CallbackIntent::PrayTimes))
        .await;

    let sent = harness.messenger.sent();
    assert_eq!(
        sent.first(),
        Some(&SentMessage::Deleted {
            conversation: "42".into(),
            message_id: 77
        })
    );
    assert_eq!(
        sent.last(),
        Some(&SentMessage::Acknowledged {
            callback_id: "cb-42".into()
        })
    );
    assert_eq!(texts_to(&harness, "42"), vec![replies::REGION_PROMPT.to_string()]);
}

#[tokio::test]
async fn test_region_selection_saves_and_sends_times() {
    let harness = Harness::at(9, 0);

    harness
        .services
        .interactions
        .process(press("42", CallbackIntent::SelectRegion("toshkent".into())))
        .await;

    let saved = harness.store.subscriber("42").await.unwrap();
    assert_eq!(saved.region.as_deref(), Some("toshkent"));
    assert_eq!(saved.name.as_deref(), Some("Ali"));

    let texts = texts_to(&harness, "42");
    assert_eq!(texts.len(), 2);
    assert!(texts[0].contains("14.03.2025"));
    assert!(texts[0].contains("- Bomdod: 05:12"));
    assert!(texts[0].contains("- Xufton: 19:53"));
    assert_eq!(texts[1], replies::region_saved("Toshkent"));
}

#[tokio::test]
async fn test_unknown_region_is_rejected() {
    let harness = Harness::at(9, 0);

    harness
        .services
        .interactions
        .process(press("42", CallbackIntent::SelectRegion("atlantis".into())))
        .await;

    assert_eq!(texts_to(&harness, "42"), vec![replies::UNKNOWN_REGION.to_string()]);
    assert!(harness.store.subscriber("42").await.is_none());
}

#[tokio::test]
async fn test_provider_failure_still_saves_region() {
    let harness = Harness::at(9, 0);

    harness
        .services
        .interactions
        .process(press("42", CallbackIntent::SelectRegion("buxoro".into())))
        .await;

    let texts = texts_to(&harness, "42");
    assert_eq!(texts[0], replies::PRAYER_TIMES_FAILED);
    assert_eq!(texts[1], replies::region_saved("Buxoro"));
    assert_eq!(
        harness.store.subscriber("42").await.unwrap().region.as_deref(),
        Some("buxoro")
    );
}

#[tokio::test]
async fn test_dua_time_selection() {
    let harness = Harness::at(9, 0);
    let interactions = &harness.services.interactions;

    interactions
        .process(press("42", CallbackIntent::SelectDuaTime("20:00".into())))
        .await;
    assert_eq!(
        harness.store.subscriber("42").await.unwrap().dua_time.as_deref(),
        Some("20:00")
    );
    assert_eq!(texts_to(&harness, "42"), vec![replies::dua_time_saved("20:00")]);

    interactions
        .process(press("42", CallbackIntent::SelectDuaTime("09:00".into())))
        .await;
    assert_eq!(
        texts_to(&harness, "42").last().map(String::as_str),
        Some(replies::UNKNOWN_DUA_TIME)
    );
    assert_eq!(
        harness.store.subscriber("42").await.unwrap().dua_time.as_deref(),
        Some("20:00")
    );
}

#[tokio::test]
async fn test_dua_time_save_failure_is_reported() {
    let harness = Harness::at(9, 0);
    harness.store.set_fail_writes(true);

    harness
        .services
        .interactions
        .process(press("42", CallbackIntent::SelectDuaTime("08:00".into())))
        .await;

    assert_eq!(texts_to(&harness, "42"), vec![replies::DUA_TIME_SAVE_FAILED.to_string()]);
}

#[tokio::test]
async fn test_panel_statistics_for_admin_only() {
    let harness = Harness::at(9, 0);
    harness
        .store
        .put_subscriber(Subscriber::new("1").with_region("toshkent").with_dua_time("08:00"))
        .await;
    harness
        .store
        .put_subscriber(Subscriber::new("2").with_region("toshkent"))
        .await;
    harness
        .store
        .put_subscriber(Subscriber::new("3").with_region("buxoro").with_dua_time("22:00"))
        .await;

    harness.services.interactions.process(command("55", Command::Panel)).await;
    assert!(harness.messenger.sent().is_empty());

    harness.services.interactions.process(command(ADMIN, Command::Panel)).await;

    match &harness.messenger.sent_to(ADMIN)[0] {
        SentMessage::Text { text, keyboard, .. } => {
            assert!(text.contains("Foydalanuvchilar soni: 3"));
            assert!(text.contains("- Toshkent: 2 ta"));
            assert!(text.contains("- Buxoro: 1 ta"));
            assert!(text.contains("- 08:00: 1 ta"));
            assert!(text.contains("- 22:00: 1 ta"));
            assert!(text.find("Toshkent").unwrap() < text.find("Buxoro").unwrap());
            assert_eq!(keyboard.as_ref(), Some(&replies::admin_menu()));
        }
        other => panic!("unexpected delivery {other:?}"),
    }
}

#[tokio::test]
async fn test_library_mentions_bot_handle() {
    let harness = Harness::at(9, 0);

    harness
        .services
        .interactions
        .process(press("42", CallbackIntent::Library))
        .await;

    let texts = texts_to(&harness, "42");
    assert!(texts[0].starts_with("<b>@namoz_bot manbalari:</b>"));
}
