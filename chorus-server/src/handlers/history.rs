use crate::app::AppState;
use crate::handlers::{CommandError, Session};
use chorus_core::{HistoryRequest, ServerMessage};
use tracing::{debug, warn};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 200;

/// Absent, non-positive and oversized limits all fall back to the default.
pub fn clamp_limit(requested: Option<i64>) -> u32 {
    match requested {
        Some(n) if n > 0 && n <= i64::from(MAX_HISTORY_LIMIT) => n as u32,
        _ => DEFAULT_HISTORY_LIMIT,
    }
}

pub async fn fetch_history(
    state: &AppState,
    session: &Session,
    request: HistoryRequest,
) -> Result<(), CommandError> {
    let limit = clamp_limit(request.limit);
    if request.limit.is_some_and(|n| n != i64::from(limit)) {
        warn!(
            "{} asked for {:?} messages, using {}",
            session.username, request.limit, limit
        );
    }

    let messages = state
        .storage
        .recent_messages(limit)
        .await
        .map_err(CommandError::HistoryUnavailable)?;

    debug!("Sending {} messages of history to {}", messages.len(), session.username);
    state
        .hub
        .send_message(session.id, &ServerMessage::GetMessagesResponse(messages))
        .await?;
    Ok(())
}
