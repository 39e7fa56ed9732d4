//! Call session scenarios

use serde_json::json;

use crate::common::{only, TestHub, CALL_SYNC_DELAY};

#[tokio::test]
async fn test_group_call_start_and_join() {
    let app = TestHub::new();
    let (alice, bob, carol) = (app.user(), app.user(), app.user());
    let chat = app.group_chat(&[alice, bob, carol]);
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;
    let mut c = app.connect_quiet(carol).await;
    a.drain();
    b.drain();

    app.send(alice, "call:start", json!({ "chatId": chat, "isVideo": false }))
        .await
        .unwrap();

    assert_eq!(
        a.drain(),
        vec![json!({
            "type": "call:joined",
            "data": { "chatId": chat, "participants": [], "initiatorId": alice, "isVideo": false }
        })]
    );
    let started = json!({
        "type": "call:started",
        "data": { "chatId": chat, "participants": [alice], "initiatorId": alice, "isVideo": false }
    });
    assert_eq!(b.drain(), vec![started.clone()]);
    assert_eq!(c.drain(), vec![started]);

    app.send(bob, "call:join", json!({ "chatId": chat }))
        .await
        .unwrap();

    let joined = b.drain();
    assert_eq!(only(&joined, "call:joined")["data"]["participants"], json!([alice]));
    assert_eq!(
        a.drain(),
        vec![json!({
            "type": "call:participant_joined",
            "data": { "chatId": chat, "userId": bob }
        })]
    );
    assert!(c.drain().is_empty());

    let session = app.hub().calls().session(chat).unwrap();
    assert_eq!(session.participants(), &[alice, bob]);
}

#[tokio::test]
async fn test_join_twice_keeps_one_membership() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.group_chat(&[alice, bob]);
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;
    a.drain();

    app.send(alice, "call:start", json!({ "chatId": chat }))
        .await
        .unwrap();
    for _ in 0..2 {
        app.send(bob, "call:join", json!({ "chatId": chat }))
            .await
            .unwrap();
    }

    assert_eq!(app.hub().calls().session(chat).unwrap().len(), 2);
    assert_eq!(
        a.kinds(),
        vec!["call:joined", "call:participant_joined"]
    );
    assert_eq!(b.kinds(), vec!["call:started", "call:joined"]);
}

#[tokio::test]
async fn test_call_ends_when_one_participant_remains() {
    let app = TestHub::new();
    let (alice, bob, carol) = (app.user(), app.user(), app.user());
    let chat = app.group_chat(&[alice, bob, carol]);
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;
    let _c = app.connect_quiet(carol).await;

    app.send(alice, "call:start", json!({ "chatId": chat }))
        .await
        .unwrap();
    app.send(bob, "call:join", json!({ "chatId": chat }))
        .await
        .unwrap();
    app.send(carol, "call:join", json!({ "chatId": chat }))
        .await
        .unwrap();
    a.drain();
    b.drain();

    app.send(carol, "call:leave", json!({ "chatId": chat }))
        .await
        .unwrap();
    assert_eq!(app.hub().calls().session(chat).unwrap().len(), 2);
    assert_eq!(a.kinds(), vec!["call:participant_left"]);
    b.drain();

    app.send(bob, "call:leave", json!({ "chatId": chat }))
        .await
        .unwrap();

    assert_eq!(
        a.drain(),
        vec![
            json!({ "type": "call:participant_left", "data": { "chatId": chat, "userId": bob } }),
            json!({ "type": "call:ended", "data": {} }),
        ]
    );
    assert!(b.drain().is_empty());
    assert!(app.hub().calls().session(chat).is_none());
    assert!(app.hub().active_group_calls(&[chat]).is_empty());
}

#[tokio::test]
async fn test_lone_initiator_leaving_ends_call_quietly() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.group_chat(&[alice, bob]);
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;

    app.send(alice, "call:start", json!({ "chatId": chat }))
        .await
        .unwrap();
    a.drain();
    b.drain();

    app.send(alice, "call:leave", json!({ "chatId": chat }))
        .await
        .unwrap();

    assert!(a.drain().is_empty());
    assert!(b.drain().is_empty());
    assert!(app.hub().calls().session(chat).is_none());
}

#[tokio::test]
async fn test_leave_without_membership_is_noop() {
    let app = TestHub::new();
    let (alice, bob, carol) = (app.user(), app.user(), app.user());
    let chat = app.group_chat(&[alice, bob, carol]);
    let mut a = app.connect_quiet(alice).await;
    let _b = app.connect_quiet(bob).await;

    app.send(alice, "call:start", json!({ "chatId": chat }))
        .await
        .unwrap();
    app.send(bob, "call:join", json!({ "chatId": chat }))
        .await
        .unwrap();
    a.drain();

    app.send(carol, "call:leave", json!({ "chatId": chat }))
        .await
        .unwrap();

    assert!(a.drain().is_empty());
    assert_eq!(app.hub().calls().session(chat).unwrap().len(), 2);
}

#[tokio::test]
async fn test_disconnect_leaves_every_call() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let first = app.group_chat(&[alice, bob]);
    let second = app.group_chat(&[alice, bob]);
    let a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;

    for chat in [first, second] {
        app.send(alice, "call:start", json!({ "chatId": chat }))
            .await
            .unwrap();
        app.send(bob, "call:join", json!({ "chatId": chat }))
            .await
            .unwrap();
    }
    b.drain();

    app.disconnect(&a).await;

    let seen = b.drain();
    let ended = seen.iter().filter(|e| e["type"] == "call:ended").count();
    let left = seen
        .iter()
        .filter(|e| e["type"] == "call:participant_left")
        .count();
    assert_eq!((ended, left), (2, 2));
    assert_eq!(app.hub().calls().active_call_count(), 0);
}

#[tokio::test]
async fn test_reconnect_replays_active_calls() {
    let app = TestHub::new();
    let (alice, bob, carol) = (app.user(), app.user(), app.user());
    let chat = app.group_chat(&[alice, bob, carol]);
    let _a = app.connect_quiet(alice).await;
    let _b = app.connect_quiet(bob).await;

    app.send(alice, "call:start", json!({ "chatId": chat, "isVideo": true }))
        .await
        .unwrap();
    app.send(bob, "call:join", json!({ "chatId": chat }))
        .await
        .unwrap();

    let mut c = app.connect(carol).await;
    assert_eq!(c.kinds(), vec!["connection:established"]);

    let replayed = c
        .next_event(CALL_SYNC_DELAY * 20)
        .await
        .expect("active call replayed");
    assert_eq!(
        replayed,
        json!({
            "type": "call:started",
            "data": {
                "chatId": chat,
                "participants": [alice, bob],
                "initiatorId": alice,
                "isVideo": true
            }
        })
    );
}

#[tokio::test]
async fn test_outsider_cannot_start_or_join() {
    let app = TestHub::new();
    let (alice, bob, mallory) = (app.user(), app.user(), app.user());
    let chat = app.group_chat(&[alice, bob]);
    let mut a = app.connect_quiet(alice).await;
    let mut m = app.connect_quiet(mallory).await;

    app.send(mallory, "call:start", json!({ "chatId": chat }))
        .await
        .unwrap();
    assert!(app.hub().calls().session(chat).is_none());

    app.send(alice, "call:start", json!({ "chatId": chat }))
        .await
        .unwrap();
    a.drain();
    app.send(mallory, "call:join", json!({ "chatId": chat }))
        .await
        .unwrap();

    assert!(a.drain().is_empty());
    assert!(m.drain().is_empty());
    assert_eq!(app.hub().calls().session(chat).unwrap().len(), 1);
}

#[tokio::test]
async fn test_private_call_rings_and_relays() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let mut a = app.connect_quiet(alice).await;
    let mut b = app.connect_quiet(bob).await;
    a.drain();

    app.send(
        alice,
        "call:start",
        json!({ "chatId": chat, "targetUserId": bob, "isVideo": true }),
    )
    .await
    .unwrap();

    let ring = b.drain();
    let incoming = &only(&ring, "call:incoming")["data"];
    assert_eq!(incoming["fromUserId"], json!(alice));
    assert_eq!(incoming["isVideo"], true);
    assert_eq!(incoming["caller"]["id"], json!(alice));
    assert_eq!(
        incoming["caller"]["username"],
        json!(app.store.user(alice).unwrap().username)
    );

    app.send(bob, "call:accept", json!({ "chatId": chat, "fromUserId": alice }))
        .await
        .unwrap();
    assert_eq!(
        a.drain(),
        vec![json!({
            "type": "call:accepted",
            "data": { "chatId": chat, "acceptedByUserId": bob }
        })]
    );

    let offer = json!({ "type": "offer", "sdp": "v=0" });
    app.send(alice, "call:signal", json!({ "targetUserId": bob, "signal": offer }))
        .await
        .unwrap();
    assert_eq!(
        b.drain(),
        vec![json!({ "type": "call:signal", "data": { "fromUserId": alice, "signal": offer } })]
    );

    app.send(bob, "call:hangup", json!({ "targetUserId": alice }))
        .await
        .unwrap();
    assert_eq!(
        a.drain(),
        vec![json!({ "type": "call:ended", "data": { "byUserId": bob } })]
    );
    assert_eq!(app.hub().calls().active_call_count(), 0);
}

#[tokio::test]
async fn test_private_call_to_offline_peer_is_unavailable() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let mut a = app.connect_quiet(alice).await;

    app.send(alice, "call:start", json!({ "chatId": chat, "targetUserId": bob }))
        .await
        .unwrap();

    assert_eq!(
        a.drain(),
        vec![json!({ "type": "call:unavailable", "data": { "chatId": chat } })]
    );
}

#[tokio::test]
async fn test_reject_reaches_caller() {
    let app = TestHub::new();
    let (alice, bob) = (app.user(), app.user());
    let chat = app.private_chat(alice, bob);
    let mut a = app.connect_quiet(alice).await;
    let _b = app.connect_quiet(bob).await;
    a.drain();

    app.send(bob, "call:reject", json!({ "chatId": chat, "fromUserId": alice }))
        .await
        .unwrap();

    assert_eq!(
        a.drain(),
        vec![json!({ "type": "call:rejected", "data": { "chatId": chat } })]
    );
}
