use bytes::Bytes;
use chorus_core::{ConnectionId, MemberInfo, Role};
use tokio::sync::oneshot;

/// Запросы к хабу, кроме регистрации, отключения и широковещательной рассылки
/// (у тех свои каналы).
#[derive(Debug)]
pub enum HubRequest {
    /// Отправить сообщение одному соединению.
    SendTo { id: ConnectionId, payload: Bytes },

    /// Снимок текущих участников чата.
    Snapshot {
        reply: oneshot::Sender<Vec<MemberInfo>>,
    },

    /// Текущая роль соединения (роль может измениться после promote_user).
    RoleOf {
        id: ConnectionId,
        reply: oneshot::Sender<Option<Role>>,
    },

    /// Сменить роль подключённого пользователя. Ответ `false`, если такого нет.
    SetRole {
        username: String,
        role: Role,
        reply: oneshot::Sender<bool>,
    },
}
