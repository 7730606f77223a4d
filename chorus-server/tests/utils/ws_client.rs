use anyhow::{Context, Result, anyhow};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use super::harness::TestServer;
use super::signal_helpers::SIGNAL_TIMEOUT_MS;

/// Chat client speaking the JSON envelope protocol over a real WebSocket.
pub struct WsClient {
    pub username: String,
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    pub async fn connect(server: &TestServer, username: &str, password: &str) -> Result<Self> {
        let (stream, _response) = connect_async(server.ws_url(username, password))
            .await
            .with_context(|| format!("WebSocket connect failed for {username}"))?;

        Ok(Self {
            username: username.to_owned(),
            stream,
        })
    }

    pub async fn send(&mut self, kind: &str, payload: Option<Value>) -> Result<()> {
        let frame = match payload {
            Some(payload) => json!({ "type": kind, "payload": payload }),
            None => json!({ "type": kind }),
        };
        self.send_raw(&frame.to_string()).await
    }

    pub async fn send_raw(&mut self, text: &str) -> Result<()> {
        self.stream
            .send(Message::text(text.to_owned()))
            .await
            .context("WebSocket send failed")
    }

    /// Next JSON frame, or `None` on close or timeout.
    pub async fn next_json(&mut self, timeout_ms: u64) -> Option<Value> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            let frame = tokio::time::timeout_at(deadline, self.stream.next())
                .await
                .ok()??;

            match frame {
                Ok(Message::Text(text)) => return serde_json::from_str(text.as_str()).ok(),
                Ok(Message::Close(_)) | Err(_) => return None,
                Ok(_) => continue,
            }
        }
    }

    /// Skips frames until one of type `kind` arrives.
    pub async fn expect(&mut self, kind: &str) -> Result<Value> {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(SIGNAL_TIMEOUT_MS);

        loop {
            let left = deadline.saturating_duration_since(tokio::time::Instant::now());
            let msg = self
                .next_json(left.as_millis() as u64)
                .await
                .ok_or_else(|| anyhow!("{} never received {}", self.username, kind))?;

            tracing::debug!("[WsClient {}] <- {}", self.username, msg["type"]);
            if msg["type"] == kind {
                return Ok(msg);
            }
        }
    }

    /// True when the server closes the socket within the timeout.
    pub async fn closed_within(&mut self, timeout_ms: u64) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(timeout_ms);

        loop {
            match tokio::time::timeout_at(deadline, self.stream.next()).await {
                Err(_) => return false,
                Ok(None) | Ok(Some(Err(_))) | Ok(Some(Ok(Message::Close(_)))) => return true,
                Ok(Some(Ok(_))) => continue,
            }
        }
    }

    pub async fn close(mut self) {
        let _ = self.stream.close(None).await;
    }
}

/// HTTP status of a rejected upgrade, `None` if the upgrade succeeded.
pub async fn rejected_status(server: &TestServer, username: &str, password: &str) -> Option<u16> {
    match connect_async(server.ws_url(username, password)).await {
        Ok(_) => None,
        Err(tungstenite::Error::Http(response)) => Some(response.status().as_u16()),
        Err(e) => panic!("unexpected connect error: {e}"),
    }
}
