use crate::app::AppState;
use crate::handlers::{CommandError, Session};
use crate::signaling::ConnectionSink;
use chorus_core::{IceCandidatePayload, SdpPayload, ServerMessage};
use std::sync::Arc;

pub async fn join(state: &AppState, session: &Session) -> Result<(), CommandError> {
    let sink = Arc::new(ConnectionSink::new(state.hub.clone(), session.id));
    state
        .media
        .add_peer(&session.username, session.id, sink)
        .await
        .map_err(CommandError::Call)?;

    state
        .hub
        .send_message(session.id, &ServerMessage::JoinCallSuccess)
        .await?;
    Ok(())
}

pub async fn offer(
    state: &AppState,
    session: &Session,
    payload: SdpPayload,
) -> Result<(), CommandError> {
    state
        .media
        .handle_offer(&session.username, payload.sdp)
        .await
        .map_err(CommandError::Call)
}

pub async fn answer(
    state: &AppState,
    session: &Session,
    payload: SdpPayload,
) -> Result<(), CommandError> {
    state
        .media
        .handle_answer(&session.username, payload.sdp)
        .await
        .map_err(CommandError::Call)
}

pub async fn candidate(
    state: &AppState,
    session: &Session,
    candidate: IceCandidatePayload,
) -> Result<(), CommandError> {
    state
        .media
        .add_ice_candidate(&session.username, candidate)
        .await
        .map_err(CommandError::Call)
}
