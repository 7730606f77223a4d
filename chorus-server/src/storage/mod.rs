mod memory;
mod password;
mod sqlite;

pub use memory::MemoryStorage;
pub use password::{hash_password, verify_password};
pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chorus_core::{ChatEntry, Role};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("user {0} does not exist")]
    UnknownUser(String),

    #[error("database error: {0}")]
    Backend(#[from] sqlx::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("{0}")]
    Hash(String),
}

/// Трейт хранилища пользователей и истории чата.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Проверяет пароль существующего пользователя или создаёт нового с ролью `peasant`.
    async fn authenticate_or_create(&self, username: &str, password: &str)
    -> Result<Role, StorageError>;

    async fn insert_message(&self, entry: &ChatEntry) -> Result<(), StorageError>;

    /// Последние `limit` сообщений, новые первыми.
    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatEntry>, StorageError>;

    async fn update_role(&self, username: &str, role: Role) -> Result<(), StorageError>;

    /// Создаёт пользователя или перезаписывает его пароль и роль.
    async fn ensure_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), StorageError>;
}
