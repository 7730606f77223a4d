use crate::app::AppState;
use crate::handlers::{Session, dispatch};
use crate::hub::ConnectionEntry;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use chorus_core::{ClientMessage, ConnectionId, Role};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

#[derive(Debug, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(credentials): Query<Credentials>,
    State(state): State<AppState>,
) -> Response {
    let Credentials { username, password } = credentials;

    if username.is_empty() || password.is_empty() {
        warn!("Rejecting connection without credentials");
        return (StatusCode::BAD_REQUEST, "username and password are required").into_response();
    }

    let role = match state
        .storage
        .authenticate_or_create(&username, &password)
        .await
    {
        Ok(role) => role,
        Err(e) => {
            warn!("Authentication failed for {}: {}", username, e);
            return (StatusCode::UNAUTHORIZED, "Authentication failed").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, username, role, state))
}

async fn handle_socket(socket: WebSocket, username: String, role: Role, state: AppState) {
    let id = ConnectionId::new();
    info!("New WebSocket connection {} for {} ({})", id, username, role);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<Bytes>(state.config.outbound_queue);

    if let Err(e) = state
        .hub
        .register(ConnectionEntry::new(id, username.clone(), role, tx))
        .await
    {
        error!("Hub unavailable, dropping {}: {}", id, e);
        return;
    }

    // The queue closes when the hub detaches the connection.
    let mut send_task = tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            let text = String::from_utf8_lossy(&payload).into_owned();
            if sender.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.send(Message::Close(None)).await;
    });

    let mut recv_task = tokio::spawn({
        let state = state.clone();
        let session = Session {
            id,
            username: username.clone(),
        };

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                let frame = match msg {
                    Message::Text(text) => Bytes::copy_from_slice(text.as_bytes()),
                    Message::Binary(data) => data,
                    Message::Close(_) => break,
                    _ => continue,
                };

                match ClientMessage::decode(&frame) {
                    Ok(message) => dispatch(&state, &session, message).await,
                    Err(e) => warn!("Dropping frame from {}: {}", session.username, e),
                }
            }
            debug!("Read loop of {} finished", session.username);
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    if let Err(e) = state.hub.unregister(id).await {
        debug!("Hub gone while unregistering {}: {}", id, e);
    }
    info!("WebSocket disconnected: {} ({})", id, username);
}
