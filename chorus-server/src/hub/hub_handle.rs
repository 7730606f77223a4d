use crate::hub::hub_command::HubRequest;
use crate::hub::ConnectionEntry;
use bytes::Bytes;
use chorus_core::{ConnectionId, MemberInfo, Role, ServerMessage};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Error)]
pub enum HubError {
    #[error("hub is not running")]
    Closed,

    #[error("failed to serialize message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Cloneable front door to the hub task.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<ConnectionEntry>,
    unregister_tx: mpsc::Sender<ConnectionId>,
    request_tx: mpsc::Sender<HubRequest>,
    broadcast_tx: mpsc::Sender<Bytes>,
}

impl HubHandle {
    pub(crate) fn new(
        register_tx: mpsc::Sender<ConnectionEntry>,
        unregister_tx: mpsc::Sender<ConnectionId>,
        request_tx: mpsc::Sender<HubRequest>,
        broadcast_tx: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            register_tx,
            unregister_tx,
            request_tx,
            broadcast_tx,
        }
    }

    pub async fn register(&self, entry: ConnectionEntry) -> Result<(), HubError> {
        self.register_tx
            .send(entry)
            .await
            .map_err(|_| HubError::Closed)
    }

    pub async fn unregister(&self, id: ConnectionId) -> Result<(), HubError> {
        self.unregister_tx
            .send(id)
            .await
            .map_err(|_| HubError::Closed)
    }

    pub async fn broadcast(&self, payload: Bytes) -> Result<(), HubError> {
        self.broadcast_tx
            .send(payload)
            .await
            .map_err(|_| HubError::Closed)
    }

    pub async fn broadcast_message(&self, message: &ServerMessage) -> Result<(), HubError> {
        self.broadcast(message.encode()?).await
    }

    pub async fn send_to(&self, id: ConnectionId, payload: Bytes) -> Result<(), HubError> {
        self.request(HubRequest::SendTo { id, payload }).await
    }

    pub async fn send_message(
        &self,
        id: ConnectionId,
        message: &ServerMessage,
    ) -> Result<(), HubError> {
        self.send_to(id, message.encode()?).await
    }

    pub async fn snapshot(&self) -> Result<Vec<MemberInfo>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.request(HubRequest::Snapshot { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn role_of(&self, id: ConnectionId) -> Result<Option<Role>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.request(HubRequest::RoleOf { id, reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    pub async fn set_role(&self, username: &str, role: Role) -> Result<bool, HubError> {
        let (reply, rx) = oneshot::channel();
        self.request(HubRequest::SetRole {
            username: username.to_owned(),
            role,
            reply,
        })
        .await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    async fn request(&self, request: HubRequest) -> Result<(), HubError> {
        self.request_tx
            .send(request)
            .await
            .map_err(|_| HubError::Closed)
    }
}
