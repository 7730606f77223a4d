use crate::app::AppState;
use crate::handlers::{CommandError, call, chat, history, members, promote};
use chorus_core::{ClientMessage, ConnectionId, ServerMessage};
use tracing::{debug, error, warn};

/// Identity of the connection a command came from.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: ConnectionId,
    pub username: String,
}

pub async fn dispatch(state: &AppState, session: &Session, message: ClientMessage) {
    let kind = message.kind();
    debug!("{} -> {}", session.username, kind);

    let result = match message {
        ClientMessage::Chat(payload) => chat::post(state, session, payload).await,
        ClientMessage::JoinCall => call::join(state, session).await,
        ClientMessage::SdpOffer(payload) => call::offer(state, session, payload).await,
        ClientMessage::SdpAnswer(payload) => call::answer(state, session, payload).await,
        ClientMessage::IceCandidate(candidate) => call::candidate(state, session, candidate).await,
        ClientMessage::PromoteUser(payload) => promote::promote_user(state, session, payload).await,
        ClientMessage::ListChatMembers => members::list_chat_members(state, session).await,
        ClientMessage::ListCallMembers => members::list_call_members(state, session).await,
        ClientMessage::History(request) => history::fetch_history(state, session, request).await,
    };

    if let Err(e) = result {
        report(state, session, kind, e).await;
    }
}

async fn report(state: &AppState, session: &Session, kind: &str, err: CommandError) {
    if !err.is_reportable() {
        error!("{} from {} failed: {}", kind, session.username, err);
        return;
    }

    warn!("{} from {} rejected: {}", kind, session.username, err);
    let reply = ServerMessage::system_error(err.to_string());
    if let Err(e) = state.hub.send_message(session.id, &reply).await {
        error!("Failed to report error to {}: {}", session.username, e);
    }
}
