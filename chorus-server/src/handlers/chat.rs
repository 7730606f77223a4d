use crate::app::AppState;
use crate::handlers::{CommandError, Session};
use chorus_core::{ChatEntry, ChatPayload, ServerMessage};
use tracing::{debug, error};

/// Persists the message in the background and broadcasts it right away.
pub async fn post(
    state: &AppState,
    session: &Session,
    payload: ChatPayload,
) -> Result<(), CommandError> {
    let Some(role) = state.hub.role_of(session.id).await? else {
        debug!("Dropping chat from detached connection {}", session.id);
        return Ok(());
    };

    let entry = ChatEntry {
        sender: session.username.clone(),
        role,
        kind: payload.kind,
        content: payload.content,
    };

    let storage = state.storage.clone();
    let stored = entry.clone();
    tokio::spawn(async move {
        if let Err(e) = storage.insert_message(&stored).await {
            error!("Failed to persist message from {}: {}", stored.sender, e);
        }
    });

    state
        .hub
        .broadcast_message(&ServerMessage::ChatMessage(entry))
        .await?;
    Ok(())
}
