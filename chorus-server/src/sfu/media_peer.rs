use crate::signaling::{send_message, SignalingSink};
use anyhow::{anyhow, Result};
use chorus_core::{ConnectionId, IceCandidatePayload, ServerMessage, SessionDescription};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Mutex;
use tracing::debug;
use webrtc::ice_transport::ice_candidate::RTCIceCandidateInit;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::signaling_state::RTCSignalingState;

/// One call participant: the server-side peer connection plus the channel
/// its signaling goes out through.
pub struct MediaPeer {
    pub username: String,
    /// Chat connection that joined the call.
    pub connection: ConnectionId,
    pub(crate) session: u64,
    pub(crate) peer_connection: Arc<RTCPeerConnection>,
    sink: Arc<dyn SignalingSink>,
    /// Serializes offer/answer exchanges on this connection.
    pub(crate) negotiation: Mutex<()>,
    /// Ids of tracks this participant publishes.
    pub(crate) published: Mutex<Vec<String>>,
    /// Set once the first browser offer has been answered.
    ready: AtomicBool,
    pub(crate) generation: AtomicU64,
}

impl MediaPeer {
    pub(crate) fn new(
        username: String,
        connection: ConnectionId,
        session: u64,
        peer_connection: Arc<RTCPeerConnection>,
        sink: Arc<dyn SignalingSink>,
    ) -> Self {
        Self {
            username,
            connection,
            session,
            peer_connection,
            sink,
            negotiation: Mutex::new(()),
            published: Mutex::new(Vec::new()),
            ready: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    pub fn signaling_state(&self) -> RTCSignalingState {
        self.peer_connection.signaling_state()
    }

    pub(crate) async fn send(&self, message: &ServerMessage) {
        send_message(self.sink.as_ref(), message).await;
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
    }

    /// Sends a fresh server offer. Returns `false` when it is not our turn:
    /// before the browser's first offer, or mid-exchange. The peer connection
    /// raises negotiation-needed again once it is back in stable state.
    pub(crate) async fn offer(&self) -> Result<bool> {
        let _guard = self.negotiation.lock().await;

        if !self.ready.load(Ordering::SeqCst) || self.signaling_state() != RTCSignalingState::Stable
        {
            debug!(
                "Deferring negotiation for {} (state {})",
                self.username,
                self.signaling_state()
            );
            return Ok(false);
        }

        let offer = self.peer_connection.create_offer(None).await?;
        let mut gathered = self.peer_connection.gathering_complete_promise().await;
        self.peer_connection.set_local_description(offer).await?;
        let _ = gathered.recv().await;

        let local = self
            .peer_connection
            .local_description()
            .await
            .ok_or_else(|| anyhow!("local description missing after offer"))?;

        self.send(&ServerMessage::SdpOffer(SessionDescription::offer(local.sdp)))
            .await;
        Ok(true)
    }

    pub(crate) async fn send_candidate(&self, candidate: RTCIceCandidateInit) {
        let payload = IceCandidatePayload {
            candidate: candidate.candidate,
            sdp_mid: candidate.sdp_mid,
            sdp_mline_index: candidate.sdp_mline_index,
            username_fragment: candidate.username_fragment,
        };
        self.send(&ServerMessage::IceCandidate(payload)).await;
    }

    pub(crate) async fn close(&self) {
        if let Err(e) = self.peer_connection.close().await {
            debug!("Closing peer connection of {} failed: {}", self.username, e);
        }
    }
}
