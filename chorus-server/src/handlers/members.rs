use crate::app::AppState;
use crate::handlers::{CommandError, Session};
use chorus_core::{CallMember, ServerMessage};

pub async fn list_chat_members(state: &AppState, session: &Session) -> Result<(), CommandError> {
    let members = state.hub.snapshot().await?;
    state
        .hub
        .send_message(session.id, &ServerMessage::ActiveClientsWsResponse(members))
        .await?;
    Ok(())
}

pub async fn list_call_members(state: &AppState, session: &Session) -> Result<(), CommandError> {
    let members = state
        .media
        .participants()
        .await
        .into_iter()
        .map(|username| CallMember { username })
        .collect();

    state
        .hub
        .send_message(session.id, &ServerMessage::ActiveClientsSfuResponse(members))
        .await?;
    Ok(())
}
