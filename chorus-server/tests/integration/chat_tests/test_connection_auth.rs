use crate::integration::init_tracing;
use crate::utils::{WsClient, rejected_status, spawn_server};

#[tokio::test]
async fn test_missing_credentials_are_bad_request() {
    init_tracing();
    let server = spawn_server().await;

    assert_eq!(rejected_status(&server, "", "pw").await, Some(400));
    assert_eq!(rejected_status(&server, "alice", "").await, Some(400));
}

#[tokio::test]
async fn test_wrong_password_is_unauthorized() {
    init_tracing();
    let server = spawn_server().await;

    let first = WsClient::connect(&server, "alice", "right")
        .await
        .expect("first login creates the account");
    first.close().await;

    assert_eq!(rejected_status(&server, "alice", "wrong").await, Some(401));
}

#[tokio::test]
async fn test_connection_is_greeted() {
    init_tracing();
    let server = spawn_server().await;

    let mut alice = WsClient::connect(&server, "alice", "pw").await.unwrap();
    let welcome = alice.expect("system_message").await.unwrap();

    assert!(
        welcome["payload"]["message"]
            .as_str()
            .unwrap()
            .contains("alice")
    );
    alice.close().await;
}
