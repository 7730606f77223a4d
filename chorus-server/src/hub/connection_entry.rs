use bytes::Bytes;
use chorus_core::{ConnectionId, MemberInfo, Role};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

pub const DEFAULT_OUTBOUND_QUEUE: usize = 256;

/// Hub-side view of one chat connection. The hub owns the only sender of the
/// outbound queue, so dropping the entry closes the queue and ends the
/// connection's write loop.
#[derive(Debug)]
pub struct ConnectionEntry {
    pub id: ConnectionId,
    pub username: String,
    pub role: Role,
    outbound: mpsc::Sender<Bytes>,
}

impl ConnectionEntry {
    pub fn new(
        id: ConnectionId,
        username: impl Into<String>,
        role: Role,
        outbound: mpsc::Sender<Bytes>,
    ) -> Self {
        Self {
            id,
            username: username.into(),
            role,
            outbound,
        }
    }

    pub fn info(&self) -> MemberInfo {
        MemberInfo {
            username: self.username.clone(),
            role: self.role,
        }
    }

    pub(crate) fn try_deliver(&self, payload: Bytes) -> Result<(), TrySendError<Bytes>> {
        self.outbound.try_send(payload)
    }
}
