use crate::integration::init_tracing;
use crate::utils::{WsClient, spawn_server};

#[tokio::test]
async fn test_second_login_evicts_first() {
    init_tracing();
    let server = spawn_server().await;

    let mut observer = WsClient::connect(&server, "observer", "pw").await.unwrap();
    let mut first = WsClient::connect(&server, "alice", "pw").await.unwrap();
    observer.expect("user_join_ws").await.unwrap();

    let _second = WsClient::connect(&server, "alice", "pw").await.unwrap();

    assert!(first.closed_within(3000).await, "old socket should be closed");

    let left = observer.expect("user_leave_ws").await.unwrap();
    assert_eq!(left["payload"]["username"], "alice");
    let joined = observer.expect("user_join_ws").await.unwrap();
    assert_eq!(joined["payload"]["username"], "alice");

    observer.send("get_active_clients_ws", None).await.unwrap();
    let list = observer.expect("active_clients_ws_response").await.unwrap();
    assert_eq!(list["payload"].as_array().unwrap().len(), 2);
}
