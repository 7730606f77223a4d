use crate::integration::init_tracing;
use crate::utils::{WsClient, spawn_server};

#[tokio::test]
async fn test_closing_socket_announces_leave() {
    init_tracing();
    let server = spawn_server().await;

    let mut bob = WsClient::connect(&server, "bob", "pw").await.unwrap();
    let alice = WsClient::connect(&server, "alice", "pw").await.unwrap();
    bob.expect("user_join_ws").await.unwrap();

    alice.close().await;

    let left = bob.expect("user_leave_ws").await.unwrap();
    assert_eq!(left["payload"], serde_json::json!({"username": "alice", "role": "peasant"}));
}
