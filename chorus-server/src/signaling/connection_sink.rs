use crate::hub::HubHandle;
use crate::signaling::SignalingSink;
use async_trait::async_trait;
use bytes::Bytes;
use chorus_core::ConnectionId;
use tracing::warn;

/// Routes media signaling back through the hub, so it shares the
/// connection's outbound queue with chat traffic.
#[derive(Clone)]
pub struct ConnectionSink {
    hub: HubHandle,
    id: ConnectionId,
}

impl ConnectionSink {
    pub fn new(hub: HubHandle, id: ConnectionId) -> Self {
        Self { hub, id }
    }
}

#[async_trait]
impl SignalingSink for ConnectionSink {
    async fn send(&self, payload: Bytes) {
        if let Err(e) = self.hub.send_to(self.id, payload).await {
            warn!("Failed to route signaling to {}: {}", self.id, e);
        }
    }
}
