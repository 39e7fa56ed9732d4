//! Typing indicator scenarios

use serde_json::json;

use crate::common::{only, TestHub};

#[tokio::test]
async fn test_typing_reaches_everyone_but_the_typist() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;
    a.drain();

    app.send(alice, "typing:start", json!({ "chatId": chat }))
        .await
        .unwrap();

    assert!(a.drain().is_empty());
    assert_eq!(
        b.drain(),
        vec![json!({
            "type": "typing:update",
            "data": { "chatId": chat, "userId": alice, "isTyping": true }
        })]
    );
    assert_eq!(app.hub().typing().typing_users(chat), vec![alice]);
}

#[tokio::test]
async fn test_repeated_stop_is_rebroadcast() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let _a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;

    for _ in 0..2 {
        app.send(alice, "typing:stop", json!({ "chatId": chat }))
            .await
            .unwrap();
    }

    assert_eq!(b.kinds(), vec!["typing:update", "typing:update"]);
    assert!(app.hub().typing().typing_users(chat).is_empty());
}

#[tokio::test]
async fn test_disconnect_clears_typing() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let group = app.group_chat(&[alice, bob]);
    let a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;

    for chat_id in [chat, group] {
        app.send(alice, "typing:start", json!({ "chatId": chat_id }))
            .await
            .unwrap();
    }
    b.drain();

    app.disconnect(&a).await;

    let seen = b.drain();
    let stopped: Vec<_> = seen
        .iter()
        .filter(|e| e["type"] == "typing:update")
        .map(|e| (e["data"]["chatId"].clone(), e["data"]["isTyping"].clone()))
        .collect();
    assert_eq!(stopped.len(), 2);
    assert!(stopped.iter().all(|(_, typing)| *typing == json!(false)));
    assert_eq!(only(&seen, "user:status")["data"]["status"], "offline");
    assert!(!app.hub().typing().is_typing(alice, chat));
    assert!(!app.hub().typing().is_typing(alice, group));
}

#[tokio::test]
async fn test_replacement_clears_typing() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let _first = app.connect_quiet(alice).await;
    let _b = app.connect_quiet(bob).await;

    app.send(alice, "typing:start", json!({ "chatId": chat }))
        .await
        .unwrap();
    let _second = app.connect(alice).await;

    assert!(!app.hub().typing().is_typing(alice, chat));
}
