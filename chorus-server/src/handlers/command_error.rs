use crate::hub::HubError;
use crate::storage::StorageError;
use thiserror::Error;

/// Ошибки обработки команд клиента. Видимые клиенту варианты уходят ему как `system_error`.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Only admins can change roles")]
    Forbidden,

    #[error("Invalid role '{0}'")]
    InvalidRole(String),

    #[error("User '{0}' is not connected")]
    UnknownUser(String),

    #[error("Failed to load message history")]
    HistoryUnavailable(#[source] StorageError),

    #[error("Call error: {0:#}")]
    Call(anyhow::Error),

    #[error(transparent)]
    Hub(#[from] HubError),
}

impl CommandError {
    pub fn is_reportable(&self) -> bool {
        !matches!(self, CommandError::Hub(_))
    }
}
