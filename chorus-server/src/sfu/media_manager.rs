use crate::sfu::media_peer::MediaPeer;
use crate::sfu::sfu_event::{EventPublisher, SfuEventKind};
use crate::sfu::track_forwarder::forward_rtp;
use crate::sfu::transport_config::TransportConfig;
use crate::signaling::SignalingSink;
use anyhow::{Context, Result, anyhow};
use chorus_core::{ConnectionId, IceCandidatePayload, ServerMessage, SessionDescription};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use webrtc::api::API;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::peer_connection::signaling_state::RTCSignalingState;
use webrtc::rtp_transceiver::rtp_codec::RTPCodecType;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_rtp::TrackLocalStaticRTP;
use webrtc::track::track_remote::TrackRemote;

pub const DEFAULT_NEGOTIATION_TIMEOUT: Duration = Duration::from_secs(30);

struct PublishedTrack {
    owner: u64,
    local: Arc<TrackLocalStaticRTP>,
    cancel: CancellationToken,
}

#[derive(Default)]
struct MediaState {
    peers: HashMap<String, Arc<MediaPeer>>,
    tracks: HashMap<String, PublishedTrack>,
}

struct MediaInner {
    api: API,
    config: TransportConfig,
    state: RwLock<MediaState>,
    events: EventPublisher,
    negotiation_timeout: Duration,
    next_session: AtomicU64,
}

/// Audio call registry and forwarding plane. Every participant gets one peer
/// connection; each incoming audio track is fanned out to all other
/// participants through a server-owned local track.
#[derive(Clone)]
pub struct MediaManager {
    inner: Arc<MediaInner>,
}

impl MediaManager {
    /// A zero `negotiation_timeout` disables the renegotiation watchdog.
    pub fn new(
        config: TransportConfig,
        events: EventPublisher,
        negotiation_timeout: Duration,
    ) -> Result<Self> {
        let api = config.build_api().context("Failed to build WebRTC API")?;

        Ok(Self {
            inner: Arc::new(MediaInner {
                api,
                config,
                state: RwLock::new(MediaState::default()),
                events,
                negotiation_timeout,
                next_session: AtomicU64::new(1),
            }),
        })
    }

    fn from_weak(inner: &Weak<MediaInner>) -> Option<Self> {
        inner.upgrade().map(|inner| Self { inner })
    }

    /// Joins `username` to the call on behalf of `connection`, replacing any
    /// earlier participation.
    pub async fn add_peer(
        &self,
        username: &str,
        connection: ConnectionId,
        sink: Arc<dyn SignalingSink>,
    ) -> Result<Arc<MediaPeer>> {
        self.remove_peer(username).await;

        let peer_connection = Arc::new(
            self.inner
                .api
                .new_peer_connection(self.inner.config.rtc_configuration())
                .await?,
        );

        add_transceiver_or_close(
            &peer_connection,
            RTPCodecType::Audio,
            RTCRtpTransceiverDirection::Recvonly,
        )
        .await?;

        let session = self.inner.next_session.fetch_add(1, Ordering::SeqCst);
        let peer = Arc::new(MediaPeer::new(
            username.to_owned(),
            connection,
            session,
            peer_connection.clone(),
            sink,
        ));
        self.install_callbacks(&peer_connection, &peer);

        let displaced = {
            let mut state = self.inner.state.write().await;
            let displaced = state.peers.insert(username.to_owned(), peer.clone());
            match displaced {
                Some(old) => {
                    let tracks = Self::take_tracks(&mut state, &old).await;
                    Some((old, tracks))
                }
                None => None,
            }
        };
        if let Some((old, tracks)) = displaced {
            self.teardown(old, tracks).await;
        }

        info!("User {} joined the call (session {})", username, session);
        self.inner.events.publish(username, SfuEventKind::JoinedCall);

        Ok(peer)
    }

    /// Removes the participant, if present, and detaches its tracks from
    /// everyone else.
    pub async fn remove_peer(&self, username: &str) {
        self.remove_matching(username, |_| true).await;
    }

    /// Like `remove_peer`, but only if the participant joined through
    /// `connection`. A newer connection of the same user keeps its call.
    pub async fn remove_peer_for(&self, username: &str, connection: ConnectionId) {
        self.remove_matching(username, |p| p.connection == connection)
            .await;
    }

    /// Like `remove_peer`, but only if `peer` is still the registered
    /// participant for its username.
    pub(crate) async fn remove_peer_instance(&self, peer: &Arc<MediaPeer>) {
        self.remove_matching(&peer.username, |p| std::ptr::eq(p, peer.as_ref()))
            .await;
    }

    async fn remove_matching(&self, username: &str, matches: impl Fn(&MediaPeer) -> bool) {
        let removed = {
            let mut state = self.inner.state.write().await;
            let current = state
                .peers
                .get(username)
                .is_some_and(|p| matches(p.as_ref()));
            match current.then(|| state.peers.remove(username)).flatten() {
                Some(peer) => {
                    let tracks = Self::take_tracks(&mut state, &peer).await;
                    Some((peer, tracks))
                }
                None => None,
            }
        };

        if let Some((peer, tracks)) = removed {
            self.teardown(peer, tracks).await;
        }
    }

    async fn take_tracks(state: &mut MediaState, peer: &MediaPeer) -> Vec<PublishedTrack> {
        let ids = std::mem::take(&mut *peer.published.lock().await);
        let mut tracks = Vec::with_capacity(ids.len());
        for id in ids {
            if state.tracks.get(&id).is_some_and(|t| t.owner == peer.session) {
                tracks.extend(state.tracks.remove(&id));
            }
        }
        tracks
    }

    async fn teardown(&self, peer: Arc<MediaPeer>, tracks: Vec<PublishedTrack>) {
        for track in &tracks {
            track.cancel.cancel();
            self.detach_track(track.local.id()).await;
        }
        peer.close().await;

        info!(
            "User {} left the call ({} tracks withdrawn)",
            peer.username,
            tracks.len()
        );
        self.inner
            .events
            .publish(&peer.username, SfuEventKind::LeftCall);
    }

    pub async fn participants(&self) -> Vec<String> {
        let state = self.inner.state.read().await;
        let mut names: Vec<String> = state.peers.keys().cloned().collect();
        names.sort();
        names
    }

    /// Ids of the tracks currently being forwarded, sorted.
    pub async fn track_ids(&self) -> Vec<String> {
        let state = self.inner.state.read().await;
        let mut ids: Vec<String> = state.tracks.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub(crate) async fn peer(&self, username: &str) -> Option<Arc<MediaPeer>> {
        self.inner.state.read().await.peers.get(username).cloned()
    }

    async fn require_peer(&self, username: &str) -> Result<Arc<MediaPeer>> {
        self.peer(username)
            .await
            .ok_or_else(|| anyhow!("{} is not in the call", username))
    }

    /// Applies a browser offer, binds every track already in the call and
    /// answers once ICE gathering is complete.
    pub async fn handle_offer(&self, username: &str, sdp: String) -> Result<()> {
        let peer = self.require_peer(username).await?;

        {
            let _guard = peer.negotiation.lock().await;
            let pc = &peer.peer_connection;

            pc.set_remote_description(RTCSessionDescription::offer(sdp)?)
                .await?;
            self.attach_existing_tracks(&peer).await;

            let answer = pc.create_answer(None).await?;
            let mut gathered = pc.gathering_complete_promise().await;
            pc.set_local_description(answer).await?;
            let _ = gathered.recv().await;

            let local = pc
                .local_description()
                .await
                .ok_or_else(|| anyhow!("local description missing after answer"))?;

            peer.send(&ServerMessage::SdpAnswer(SessionDescription::answer(
                local.sdp,
            )))
            .await;
            peer.mark_ready();
        }

        Ok(())
    }

    /// Applies the browser's answer to a server offer. Answers arriving in
    /// any other signaling state are ignored.
    pub async fn handle_answer(&self, username: &str, sdp: String) -> Result<()> {
        let peer = self.require_peer(username).await?;

        {
            let _guard = peer.negotiation.lock().await;
            let state = peer.signaling_state();
            if state != RTCSignalingState::HaveLocalOffer {
                warn!("Ignoring answer from {} in state {}", username, state);
                return Ok(());
            }

            peer.peer_connection
                .set_remote_description(RTCSessionDescription::answer(sdp)?)
                .await?;
            peer.generation.fetch_add(1, Ordering::SeqCst);
        }

        Ok(())
    }

    /// Candidates that arrive before the first remote description are
    /// dropped.
    pub async fn add_ice_candidate(
        &self,
        username: &str,
        candidate: IceCandidatePayload,
    ) -> Result<()> {
        let peer = self.require_peer(username).await?;

        if peer.peer_connection.remote_description().await.is_none() {
            debug!(
                "Dropping ICE candidate from {} received before remote description",
                username
            );
            return Ok(());
        }

        peer.peer_connection
            .add_ice_candidate(RTCIceCandidateInit {
                candidate: candidate.candidate,
                sdp_mid: candidate.sdp_mid,
                sdp_mline_index: candidate.sdp_mline_index,
                username_fragment: candidate.username_fragment,
            })
            .await?;
        Ok(())
    }

    pub(crate) async fn renegotiate(&self, peer: &Arc<MediaPeer>) {
        match peer.offer().await {
            Ok(true) => self.arm_negotiation_timeout(peer),
            Ok(false) => {}
            Err(e) => warn!("Renegotiation with {} failed: {:?}", peer.username, e),
        }
    }

    fn arm_negotiation_timeout(&self, peer: &Arc<MediaPeer>) {
        let timeout = self.inner.negotiation_timeout;
        if timeout.is_zero() {
            return;
        }

        let generation = peer.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let weak_inner = Arc::downgrade(&self.inner);
        let weak_peer = Arc::downgrade(peer);

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            let (Some(manager), Some(peer)) = (Self::from_weak(&weak_inner), weak_peer.upgrade())
            else {
                return;
            };

            if peer.generation.load(Ordering::SeqCst) == generation
                && peer.signaling_state() == RTCSignalingState::HaveLocalOffer
            {
                warn!(
                    "{} did not answer renegotiation within {:?}, removing from call",
                    peer.username, timeout
                );
                manager.remove_peer_instance(&peer).await;
            }
        });
    }

    fn install_callbacks(&self, pc: &Arc<RTCPeerConnection>, peer: &Arc<MediaPeer>) {
        let weak_inner = Arc::downgrade(&self.inner);
        let weak_peer = Arc::downgrade(peer);

        let (inner_n, peer_n) = (weak_inner.clone(), weak_peer.clone());
        pc.on_negotiation_needed(Box::new(move || {
            let (inner, peer) = (inner_n.clone(), peer_n.clone());

            Box::pin(async move {
                let (Some(manager), Some(peer)) = (Self::from_weak(&inner), peer.upgrade()) else {
                    return;
                };
                tokio::spawn(async move { manager.renegotiate(&peer).await });
            })
        }));

        let peer_ice = weak_peer.clone();
        pc.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let peer = peer_ice.clone();

            Box::pin(async move {
                let (Some(candidate), Some(peer)) = (c, peer.upgrade()) else {
                    return;
                };
                match candidate.to_json() {
                    Ok(init) => peer.send_candidate(init).await,
                    Err(e) => debug!("Failed to serialize local candidate: {}", e),
                }
            })
        }));

        let (inner_s, peer_s) = (weak_inner.clone(), weak_peer.clone());
        pc.on_peer_connection_state_change(Box::new(move |s: RTCPeerConnectionState| {
            let (inner, peer) = (inner_s.clone(), peer_s.clone());

            Box::pin(async move {
                let (Some(manager), Some(peer)) = (Self::from_weak(&inner), peer.upgrade()) else {
                    return;
                };
                info!("Peer connection of {} is now {}", peer.username, s);

                if matches!(
                    s,
                    RTCPeerConnectionState::Failed | RTCPeerConnectionState::Closed
                ) {
                    tokio::spawn(async move { manager.remove_peer_instance(&peer).await });
                }
            })
        }));

        let (inner_t, peer_t) = (weak_inner, weak_peer);
        pc.on_track(Box::new(
            move |remote: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let (inner, peer) = (inner_t.clone(), peer_t.clone());

                Box::pin(async move {
                    let (Some(manager), Some(peer)) = (Self::from_weak(&inner), peer.upgrade())
                    else {
                        return;
                    };
                    tokio::spawn(async move { manager.publish_track(peer, remote).await });
                })
            },
        ));
    }

    /// Mirrors an incoming track into a local track, fans it out and starts
    /// forwarding.
    async fn publish_track(&self, owner: Arc<MediaPeer>, remote: Arc<TrackRemote>) {
        let local = Arc::new(TrackLocalStaticRTP::new(
            remote.codec().capability,
            remote.id(),
            remote.stream_id(),
        ));

        let Some(cancel) = self.register_track(&owner, local.clone()).await else {
            return;
        };

        info!(
            "User {} published {} track {} (ssrc {})",
            owner.username,
            remote.kind(),
            local.id(),
            remote.ssrc()
        );

        let manager = self.clone();
        let session = owner.session;
        tokio::spawn(async move {
            let track_id = local.id().to_owned();
            let forwarded = forward_rtp(remote.as_ref(), local.as_ref(), &cancel, &track_id).await;
            debug!(track_id = %track_id, forwarded, "Forwarder finished");
            manager.unpublish_track(&track_id, session).await;
        });
    }

    /// Records the track as published by `owner` and binds it to every other
    /// participant. Returns `None` when `owner` already left the call.
    pub(crate) async fn register_track(
        &self,
        owner: &Arc<MediaPeer>,
        local: Arc<TrackLocalStaticRTP>,
    ) -> Option<CancellationToken> {
        let track_id = local.id().to_owned();
        let cancel = CancellationToken::new();

        let targets: Vec<Arc<MediaPeer>> = {
            let mut state = self.inner.state.write().await;
            let current = state
                .peers
                .get(&owner.username)
                .is_some_and(|p| Arc::ptr_eq(p, owner));
            if !current {
                debug!("Track {} arrived after {} left", track_id, owner.username);
                return None;
            }

            let previous = state.tracks.insert(
                track_id.clone(),
                PublishedTrack {
                    owner: owner.session,
                    local: local.clone(),
                    cancel: cancel.clone(),
                },
            );
            if let Some(previous) = previous {
                warn!("Track id {} published twice, replacing", track_id);
                previous.cancel.cancel();
            }
            let mut published = owner.published.lock().await;
            if !published.contains(&track_id) {
                published.push(track_id.clone());
            }
            drop(published);

            state
                .peers
                .values()
                .filter(|p| p.session != owner.session)
                .cloned()
                .collect()
        };

        for peer in targets {
            self.bind_track(&peer, local.clone()).await;
        }

        Some(cancel)
    }

    async fn unpublish_track(&self, track_id: &str, owner: u64) {
        let removed = {
            let mut state = self.inner.state.write().await;
            if !state.tracks.get(track_id).is_some_and(|t| t.owner == owner) {
                return;
            }
            if let Some(peer) = state.peers.values().find(|p| p.session == owner) {
                peer.published.lock().await.retain(|id| id != track_id);
            }
            state.tracks.remove(track_id)
        };

        if removed.is_some() {
            self.detach_track(track_id).await;
        }
    }

    async fn attach_existing_tracks(&self, peer: &Arc<MediaPeer>) {
        let tracks: Vec<Arc<TrackLocalStaticRTP>> = {
            let state = self.inner.state.read().await;
            state
                .tracks
                .values()
                .filter(|t| t.owner != peer.session)
                .map(|t| t.local.clone())
                .collect()
        };

        for local in tracks {
            self.bind_track(peer, local).await;
        }
    }

    /// Adds `local` to the peer's connection unless it is already bound.
    async fn bind_track(&self, peer: &MediaPeer, local: Arc<TrackLocalStaticRTP>) {
        if has_track(&peer.peer_connection, local.id()).await {
            return;
        }

        let track: Arc<dyn TrackLocal + Send + Sync> = local.clone();
        match peer.peer_connection.add_track(track).await {
            Ok(_) => debug!("Bound track {} to {}", local.id(), peer.username),
            Err(e) => error!(
                "Failed to bind track {} to {}: {}",
                local.id(),
                peer.username,
                e
            ),
        }
    }

    async fn detach_track(&self, track_id: &str) {
        let peers: Vec<Arc<MediaPeer>> = {
            let state = self.inner.state.read().await;
            state.peers.values().cloned().collect()
        };

        for peer in peers {
            for sender in peer.peer_connection.get_senders().await {
                let bound = sender
                    .track()
                    .await
                    .is_some_and(|track| track.id() == track_id);
                if !bound {
                    continue;
                }
                if let Err(e) = peer.peer_connection.remove_track(&sender).await {
                    warn!(
                        "Failed to remove track {} from {}: {}",
                        track_id, peer.username, e
                    );
                }
            }
        }
    }
}

/// Adds a transceiver to a connection that is not registered yet. The
/// connection is closed when that fails.
async fn add_transceiver_or_close(
    pc: &RTCPeerConnection,
    kind: RTPCodecType,
    direction: RTCRtpTransceiverDirection,
) -> Result<()> {
    let added = pc
        .add_transceiver_from_kind(
            kind,
            Some(RTCRtpTransceiverInit {
                direction,
                send_encodings: vec![],
            }),
        )
        .await;

    if let Err(e) = added {
        if let Err(close_err) = pc.close().await {
            debug!("Closing unused peer connection failed: {}", close_err);
        }
        return Err(e).with_context(|| format!("Failed to add {} transceiver", kind));
    }
    Ok(())
}

async fn has_track(pc: &RTCPeerConnection, track_id: &str) -> bool {
    for sender in pc.get_senders().await {
        if sender
            .track()
            .await
            .is_some_and(|track| track.id() == track_id)
        {
            return true;
        }
    }
    false
}
