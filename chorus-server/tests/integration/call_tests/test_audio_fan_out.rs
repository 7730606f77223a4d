use chorus_core::ConnectionId;
use chorus_server::MediaManager;
use chorus_server::sfu::event_bus;
use std::sync::Arc;
use std::time::Duration;

use crate::integration::init_tracing;
use crate::utils::{
    MEDIA_TIMEOUT_MS, MockSignalingSink, TestClient, answer_renegotiations, local_transport,
    perform_signaling,
};

const ALICE_VOICE: &[u8] = b"alice-voice";

async fn join(manager: &MediaManager, username: &str) -> (TestClient, tokio::task::JoinHandle<()>) {
    let client = TestClient::new(username).await.unwrap();
    let (sink, mut signal_rx) = MockSignalingSink::new();
    manager
        .add_peer(username, ConnectionId::new(), Arc::new(sink))
        .await
        .unwrap();

    perform_signaling(&client, manager, &mut signal_rx)
        .await
        .expect("initial negotiation");
    let answering = answer_renegotiations(client.clone(), manager.clone(), signal_rx);
    (client, answering)
}

/// Reads until a packet with the expected payload shows up.
async fn hears(client: &TestClient, marker: &[u8]) -> String {
    let track = client
        .next_remote_track(MEDIA_TIMEOUT_MS)
        .await
        .expect("remote track");

    let heard = tokio::time::timeout(Duration::from_millis(MEDIA_TIMEOUT_MS), async {
        loop {
            match track.read_rtp().await {
                Ok((packet, _)) if packet.payload.as_ref() == marker => return true,
                Ok(_) => continue,
                Err(_) => return false,
            }
        }
    })
    .await
    .unwrap_or(false);

    assert!(heard, "no packet with the expected payload");
    track.id()
}

#[tokio::test]
async fn test_speaker_is_forwarded_to_listener_only() {
    init_tracing();
    let (publisher, _events) = event_bus();
    let manager = MediaManager::new(local_transport(), publisher, Duration::ZERO).unwrap();

    let (alice, alice_answering) = join(&manager, "alice").await;
    let (bob, bob_answering) = join(&manager, "bob").await;

    let speaking = alice.start_speaking(ALICE_VOICE);

    let heard_track = hears(&bob, ALICE_VOICE).await;
    assert_eq!(heard_track, alice.microphone_id());
    assert!(manager.track_ids().await.contains(&alice.microphone_id()));

    if let Ok(track) = alice.next_remote_track(1000).await {
        assert_ne!(track.id(), alice.microphone_id(), "speaker got their own track");
    }

    speaking.abort();
    alice_answering.abort();
    bob_answering.abort();
    alice.close().await.unwrap();
    bob.close().await.unwrap();
}

#[tokio::test]
async fn test_late_joiner_hears_existing_speaker() {
    init_tracing();
    let (publisher, _events) = event_bus();
    let manager = MediaManager::new(local_transport(), publisher, Duration::ZERO).unwrap();

    let (alice, alice_answering) = join(&manager, "alice").await;
    let speaking = alice.start_speaking(ALICE_VOICE);

    let published = tokio::time::timeout(Duration::from_millis(MEDIA_TIMEOUT_MS), async {
        while manager.track_ids().await.is_empty() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await;
    assert!(published.is_ok(), "alice's track never reached the relay");

    let (carol, carol_answering) = join(&manager, "carol").await;
    let heard_track = hears(&carol, ALICE_VOICE).await;
    assert_eq!(heard_track, alice.microphone_id());

    manager.remove_peer("alice").await;
    assert!(!manager.track_ids().await.contains(&alice.microphone_id()));
    assert_eq!(manager.participants().await, vec!["carol"]);

    speaking.abort();
    alice_answering.abort();
    carol_answering.abort();
    alice.close().await.unwrap();
    carol.close().await.unwrap();
}
