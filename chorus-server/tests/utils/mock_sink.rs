use async_trait::async_trait;
use bytes::Bytes;
use chorus_server::SignalingSink;
use serde_json::Value;
use tokio::sync::mpsc;

/// Mock SignalingSink that hands every outgoing signaling frame to the test.
#[derive(Clone)]
pub struct MockSignalingSink {
    tx: mpsc::UnboundedSender<Value>,
}

impl MockSignalingSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl SignalingSink for MockSignalingSink {
    async fn send(&self, payload: Bytes) {
        let Ok(msg) = serde_json::from_slice::<Value>(&payload) else {
            tracing::warn!("[MockSink] Non-JSON signaling frame");
            return;
        };
        let _ = self.tx.send(msg);
    }
}
