use serde_json::json;

use crate::integration::init_tracing;
use crate::utils::{TestClient, WsClient, spawn_server};

#[tokio::test]
async fn test_join_call_and_negotiate_over_websocket() {
    init_tracing();
    let server = spawn_server().await;
    let mut alice = WsClient::connect(&server, "alice", "pw").await.unwrap();

    alice.send("join_call", None).await.unwrap();
    alice.expect("join_call_success").await.unwrap();

    alice.send("get_active_clients_sfu", None).await.unwrap();
    let members = alice.expect("active_clients_sfu_response").await.unwrap();
    assert_eq!(members["payload"], json!([{"username": "alice"}]));

    let browser = TestClient::new("alice").await.unwrap();
    let offer = browser.create_offer().await.unwrap();
    alice
        .send("sdp_offer", Some(json!({"type": "offer", "sdp": offer})))
        .await
        .unwrap();

    let answer = alice.expect("sdp_answer").await.unwrap();
    assert_eq!(answer["payload"]["type"], "answer");
    browser
        .set_remote_answer(answer["payload"]["sdp"].as_str().unwrap().to_owned())
        .await
        .expect("answer applies cleanly");

    browser.close().await.unwrap();
}

#[tokio::test]
async fn test_signaling_before_join_is_reported() {
    init_tracing();
    let server = spawn_server().await;
    let mut alice = WsClient::connect(&server, "alice", "pw").await.unwrap();

    alice
        .send("sdp_offer", Some(json!({"type": "offer", "sdp": "v=0"})))
        .await
        .unwrap();

    let err = alice.expect("system_error").await.unwrap();
    assert!(err["payload"]["error"].as_str().unwrap().contains("not in the call"));
}
