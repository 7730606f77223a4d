use crate::app::AppState;
use crate::handlers::{CommandError, Session};
use chorus_core::{PromoteUserPayload, Role, RoleChange, ServerMessage};
use tracing::{error, info};

/// In-memory role first, then storage, then the broadcast. The steps are not
/// atomic: a storage failure is logged and the change still goes out.
pub async fn promote_user(
    state: &AppState,
    session: &Session,
    payload: PromoteUserPayload,
) -> Result<(), CommandError> {
    let requester = state.hub.role_of(session.id).await?.unwrap_or_default();
    if !requester.can_assign_roles() {
        return Err(CommandError::Forbidden);
    }

    let new_role: Role = payload
        .new_role
        .parse()
        .map_err(|_| CommandError::InvalidRole(payload.new_role.clone()))?;

    if !state.hub.set_role(&payload.username, new_role).await? {
        return Err(CommandError::UnknownUser(payload.username));
    }

    if let Err(e) = state.storage.update_role(&payload.username, new_role).await {
        error!("Failed to persist role of {}: {}", payload.username, e);
    }

    info!(
        "{} changed role of {} to {}",
        session.username, payload.username, new_role
    );

    state
        .hub
        .broadcast_message(&ServerMessage::PromoteUserResponse(RoleChange {
            username: payload.username,
            new_role,
        }))
        .await?;
    Ok(())
}
