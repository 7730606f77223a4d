use crate::integration::init_tracing;
use crate::utils::{WsClient, spawn_server};

#[tokio::test]
async fn test_call_join_and_disconnect_are_announced() {
    init_tracing();
    let server = spawn_server().await;

    let mut bob = WsClient::connect(&server, "bob", "pw").await.unwrap();
    let mut alice = WsClient::connect(&server, "alice", "pw").await.unwrap();

    alice.send("join_call", None).await.unwrap();
    alice.expect("join_call_success").await.unwrap();

    let joined = bob.expect("user_join_sfu").await.unwrap();
    assert_eq!(joined["payload"]["username"], "alice");

    alice.close().await;

    let left = bob.expect("user_leave_sfu").await.unwrap();
    assert_eq!(left["payload"]["username"], "alice");
    assert!(server.state.media.participants().await.is_empty());
}
