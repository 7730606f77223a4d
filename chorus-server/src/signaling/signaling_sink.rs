use async_trait::async_trait;
use bytes::Bytes;
use chorus_core::ServerMessage;
use tracing::error;

/// Трейт, через который медиа-слой отправляет сигнальные сообщения
/// (SDP offer/answer, ICE) конкретному клиенту.
#[async_trait]
pub trait SignalingSink: Send + Sync {
    async fn send(&self, payload: Bytes);
}

pub(crate) async fn send_message(sink: &dyn SignalingSink, message: &ServerMessage) {
    match message.encode() {
        Ok(payload) => sink.send(payload).await,
        Err(e) => error!("Failed to serialize signaling message: {}", e),
    }
}
