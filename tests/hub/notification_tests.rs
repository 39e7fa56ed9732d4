//! Notifications pushed on behalf of the REST layer

use serde_json::json;

use chat_hub::domain::Reactions;

use crate::common::TestHub;

#[tokio::test]
async fn test_reaction_change_is_normalized_for_participants() {
    let app = TestHub::new();
    let (alice, bob, carol) = (app.user(), app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;
    let mut c = app.connect_quiet(carol).await;

    app.send(alice, "message:send", json!({ "chatId": chat, "content": "party?" }))
        .await
        .unwrap();
    let message_id = app.store.messages_in(chat)[0].id;
    a.drain();
    b.drain();

    let mut reactions = Reactions::new();
    reactions.insert("🎉".into(), vec![bob]);
    reactions.insert("👎".into(), vec![]);
    let updated = app.store.set_reactions(message_id, reactions).unwrap();

    let chat_row = app.store.chat(chat).unwrap();
    let delivered =
        app.hub()
            .notifier()
            .reaction_changed(message_id, updated.reactions, &chat_row.participants);

    assert_eq!(delivered, 2);
    let expected = vec![json!({
        "type": "message:reaction",
        "data": { "messageId": message_id, "reactions": { "🎉": [bob] } }
    })];
    assert_eq!(a.drain(), expected);
    assert_eq!(b.drain(), expected);
    assert!(c.drain().is_empty());
}

#[tokio::test]
async fn test_cleared_reactions_become_empty_object() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let mut a = app.connect_quiet(alice).await;
    let message_id = uuid::Uuid::new_v4();

    app.hub()
        .notifier()
        .reaction_changed(message_id, None, &[alice, bob]);

    assert_eq!(
        a.drain(),
        vec![json!({
            "type": "message:reaction",
            "data": { "messageId": message_id, "reactions": {} }
        })]
    );
}

#[tokio::test]
async fn test_user_update_reaches_every_connection() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;
    a.drain();

    let profile = app.store.user(alice).unwrap();
    assert_eq!(app.hub().notifier().user_updated(&profile), 2);

    for client in [&mut a, &mut b] {
        let seen = client.drain();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0]["type"], "user:updated");
        assert_eq!(seen[0]["data"]["username"], json!(profile.username));
    }
}

#[tokio::test]
async fn test_group_removal_and_deletion() {
    let app = TestHub::new();
    let (alice, bob, carol) = (app.user(), app.user(), app.user());
    let group = app.group_chat(&[alice, bob, carol]);
    let mut a = app.connect_quiet(alice).await;
    let mut c = app.connect_quiet(carol).await;
    a.drain();

    app.hub()
        .notifier()
        .removed_from_group(group, "test group", &[carol]);
    assert_eq!(
        c.drain(),
        vec![json!({
            "type": "chat:removed-from-group",
            "data": { "chatId": group, "groupName": "test group" }
        })]
    );
    assert!(a.drain().is_empty());

    let delivered = app.hub().notifier().chat_deleted(group, &[alice, bob]);
    assert_eq!(delivered, 1);
    assert_eq!(
        a.drain(),
        vec![json!({ "type": "chat:deleted", "data": { "chatId": group } })]
    );
}

#[tokio::test]
async fn test_chat_created_carries_chat_row() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.group_chat(&[alice, bob]);
    let mut b = app.connect_quiet(bob).await;

    let row = app.store.chat(chat).unwrap();
    app.hub().notifier().chat_created(&row);

    let seen = b.drain();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["type"], "chat:created");
    assert_eq!(seen[0]["data"]["id"], json!(chat));
}
