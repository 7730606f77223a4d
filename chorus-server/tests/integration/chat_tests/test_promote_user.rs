use chorus_core::Role;
use chorus_server::Storage;
use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{WsClient, spawn_server};

#[tokio::test]
async fn test_admin_promotion_is_broadcast_and_persisted() {
    init_tracing();
    let server = spawn_server().await;
    server
        .storage
        .ensure_user("root", "pw", Role::Admin)
        .await
        .unwrap();

    let mut root = WsClient::connect(&server, "root", "pw").await.unwrap();
    let mut bob = WsClient::connect(&server, "bob", "pw").await.unwrap();
    root.expect("user_join_ws").await.unwrap();

    root.send(
        "promote_user",
        Some(json!({"username": "bob", "new_role": "moderator"})),
    )
    .await
    .unwrap();

    for client in [&mut root, &mut bob] {
        let msg = client.expect("promote_user_response").await.unwrap();
        assert_eq!(msg["payload"], json!({"username": "bob", "new_role": "moderator"}));
    }

    bob.send("chat_message", Some(json!({"content": "promoted"})))
        .await
        .unwrap();
    let chat = root.expect("chat_message").await.unwrap();
    assert_eq!(chat["payload"]["role"], "moderator");

    assert_eq!(
        server
            .storage
            .authenticate_or_create("bob", "pw")
            .await
            .unwrap(),
        Role::Moderator
    );
}

#[tokio::test]
async fn test_peasant_promotion_is_refused() {
    init_tracing();
    let server = spawn_server().await;

    let mut bob = WsClient::connect(&server, "bob", "pw").await.unwrap();
    bob.send(
        "promote_user",
        Some(json!({"username": "bob", "new_role": "admin"})),
    )
    .await
    .unwrap();

    let err = bob.expect("system_error").await.unwrap();
    assert_eq!(err["payload"]["error"], "Only admins can change roles");
}
