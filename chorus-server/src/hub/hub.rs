use crate::hub::hub_command::HubRequest;
use crate::hub::hub_handle::HubHandle;
use crate::hub::{presence, ConnectionEntry};
use crate::sfu::{MediaManager, SfuEvent};
use bytes::Bytes;
use chorus_core::{ConnectionId, MemberInfo, ServerMessage};
use std::collections::{HashMap, VecDeque};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info, warn};

const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Registry of live chat connections. All mutation happens inside `run`, so
/// the connection map needs no locking.
pub struct Hub {
    clients: HashMap<ConnectionId, ConnectionEntry>,
    media: MediaManager,
    register_rx: mpsc::Receiver<ConnectionEntry>,
    unregister_rx: mpsc::Receiver<ConnectionId>,
    request_rx: mpsc::Receiver<HubRequest>,
    broadcast_rx: mpsc::Receiver<Bytes>,
    event_rx: mpsc::Receiver<SfuEvent>,
}

impl Hub {
    pub fn new(media: MediaManager, event_rx: mpsc::Receiver<SfuEvent>) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (unregister_tx, unregister_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (request_tx, request_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);

        let hub = Self {
            clients: HashMap::new(),
            media,
            register_rx,
            unregister_rx,
            request_rx,
            broadcast_rx,
            event_rx,
        };
        let handle = HubHandle::new(register_tx, unregister_tx, request_tx, broadcast_tx);

        (hub, handle)
    }

    pub fn spawn(media: MediaManager, event_rx: mpsc::Receiver<SfuEvent>) -> HubHandle {
        let (hub, handle) = Self::new(media, event_rx);
        tokio::spawn(hub.run());
        handle
    }

    pub async fn run(mut self) {
        info!("Hub event loop started");

        loop {
            tokio::select! {
                biased;

                entry = self.register_rx.recv() => {
                    match entry {
                        Some(e) => self.register(e),
                        None => {
                            info!("Hub handles dropped. Shutting down hub.");
                            break;
                        }
                    }
                }

                Some(id) = self.unregister_rx.recv() => self.unregister(id),

                Some(request) = self.request_rx.recv() => self.handle_request(request),

                Some(payload) = self.broadcast_rx.recv() => self.broadcast(payload),

                Some(event) = self.event_rx.recv() => {
                    self.broadcast_message(&presence::call_event(&event));
                }
            }
        }

        info!("Hub event loop finished");
    }

    fn register(&mut self, entry: ConnectionEntry) {
        let stale = self
            .clients
            .values()
            .find(|c| c.username == entry.username)
            .map(|c| c.id);

        if let Some(stale_id) = stale {
            warn!(
                "User {} connected again, evicting connection {}",
                entry.username, stale_id
            );
            self.unregister(stale_id);
        }

        info!(
            "Connection {} registered for {} ({})",
            entry.id, entry.username, entry.role
        );

        let id = entry.id;
        let joined = presence::member_joined(&entry);
        let welcome = presence::welcome(&entry);
        self.clients.insert(id, entry);

        self.broadcast_message(&joined);
        if let Some(payload) = encode(&welcome) {
            self.deliver(id, payload);
        }
    }

    fn unregister(&mut self, id: ConnectionId) {
        let Some(entry) = self.detach(id) else {
            debug!("Unregister for unknown connection {}", id);
            return;
        };

        info!("Connection {} of {} unregistered", id, entry.username);
        self.broadcast_message(&presence::member_left(&entry));
    }

    fn handle_request(&mut self, request: HubRequest) {
        match request {
            HubRequest::SendTo { id, payload } => {
                if self.clients.contains_key(&id) {
                    self.deliver(id, payload);
                } else {
                    debug!("Dropping direct message for unknown connection {}", id);
                }
            }

            HubRequest::Snapshot { reply } => {
                let _ = reply.send(self.snapshot());
            }

            HubRequest::RoleOf { id, reply } => {
                let _ = reply.send(self.clients.get(&id).map(|c| c.role));
            }

            HubRequest::SetRole {
                username,
                role,
                reply,
            } => {
                let mut found = false;
                for client in self.clients.values_mut().filter(|c| c.username == username) {
                    client.role = role;
                    found = true;
                }
                let _ = reply.send(found);
            }
        }
    }

    fn snapshot(&self) -> Vec<MemberInfo> {
        let mut members: Vec<MemberInfo> = self.clients.values().map(|c| c.info()).collect();
        members.sort_by(|a, b| a.username.cmp(&b.username));
        members
    }

    fn broadcast_message(&mut self, message: &ServerMessage) {
        if let Some(payload) = encode(message) {
            self.broadcast(payload);
        }
    }

    /// Delivers to every connection without waiting. A connection whose queue
    /// is full or closed is detached, and its leave notice joins the queue of
    /// pending broadcasts.
    fn broadcast(&mut self, payload: Bytes) {
        let mut pending = VecDeque::from([payload]);

        while let Some(payload) = pending.pop_front() {
            let failed: Vec<ConnectionId> = self
                .clients
                .values()
                .filter(|c| c.try_deliver(payload.clone()).is_err())
                .map(|c| c.id)
                .collect();

            for id in failed {
                if let Some(entry) = self.detach(id) {
                    warn!(
                        "Outbound queue of {} ({}) is unavailable, disconnecting",
                        entry.username, id
                    );
                    if let Some(notice) = encode(&presence::member_left(&entry)) {
                        pending.push_back(notice);
                    }
                }
            }
        }
    }

    fn deliver(&mut self, id: ConnectionId, payload: Bytes) {
        let Some(client) = self.clients.get(&id) else {
            return;
        };

        match client.try_deliver(payload) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => {
                if let Some(entry) = self.detach(id) {
                    warn!(
                        "Outbound queue of {} ({}) is unavailable, disconnecting",
                        entry.username, id
                    );
                    self.broadcast_message(&presence::member_left(&entry));
                }
            }
        }
    }

    /// Removes the connection and tears down its call participation. Dropping
    /// the returned entry closes the outbound queue.
    fn detach(&mut self, id: ConnectionId) -> Option<ConnectionEntry> {
        let entry = self.clients.remove(&id)?;

        let media = self.media.clone();
        let username = entry.username.clone();
        tokio::spawn(async move {
            media.remove_peer_for(&username, id).await;
        });

        Some(entry)
    }
}

fn encode(message: &ServerMessage) -> Option<Bytes> {
    match message.encode() {
        Ok(payload) => Some(payload),
        Err(e) => {
            error!("Failed to serialize hub message: {}", e);
            None
        }
    }
}
