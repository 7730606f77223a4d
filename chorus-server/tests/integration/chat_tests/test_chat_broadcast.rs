use chorus_server::Storage;
use serde_json::json;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{WsClient, spawn_server};

#[tokio::test]
async fn test_chat_reaches_everyone_including_sender() {
    init_tracing();
    let server = spawn_server().await;

    let mut alice = WsClient::connect(&server, "alice", "pw").await.unwrap();
    let mut bob = WsClient::connect(&server, "bob", "pw").await.unwrap();
    alice.expect("user_join_ws").await.unwrap();

    alice
        .send("chat_message", Some(json!({"type": "text", "content": "hello"})))
        .await
        .unwrap();

    for client in [&mut alice, &mut bob] {
        let msg = client.expect("chat_message").await.unwrap();
        assert_eq!(
            msg["payload"],
            json!({"sender": "alice", "role": "peasant", "type": "text", "content": "hello"})
        );
    }
}

#[tokio::test]
async fn test_history_returns_persisted_chat() {
    init_tracing();
    let server = spawn_server().await;
    let mut alice = WsClient::connect(&server, "alice", "pw").await.unwrap();

    for i in 0..3 {
        alice
            .send("chat_message", Some(json!({"content": format!("m{i}")})))
            .await
            .unwrap();

        // Persistence runs in the background.
        for _ in 0..100 {
            if server.storage.recent_messages(10).await.unwrap().len() == i + 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    alice
        .send("get_messages_request", Some(json!({"limit": 2})))
        .await
        .unwrap();
    let history = alice.expect("get_messages_response").await.unwrap();
    let entries = history["payload"].as_array().unwrap();

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["content"], "m2");
    assert_eq!(entries[1]["content"], "m1");
}

#[tokio::test]
async fn test_bad_frames_do_not_drop_the_connection() {
    init_tracing();
    let server = spawn_server().await;
    let mut alice = WsClient::connect(&server, "alice", "pw").await.unwrap();

    alice.send_raw("definitely not json").await.unwrap();
    alice.send("shout", Some(json!({"content": "?"}))).await.unwrap();
    alice
        .send("chat_message", Some(json!({"text": "missing content"})))
        .await
        .unwrap();

    alice
        .send("chat_message", Some(json!({"content": "still here"})))
        .await
        .unwrap();
    let msg = alice.expect("chat_message").await.unwrap();
    assert_eq!(msg["payload"]["content"], "still here");
}
