use crate::storage::{Storage, StorageError, hash_password, verify_password};
use async_trait::async_trait;
use chorus_core::{ChatEntry, Role};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
struct UserRecord {
    password_hash: String,
    role: Role,
}

/// Process-local storage. Nothing survives a restart.
#[derive(Default)]
pub struct MemoryStorage {
    users: DashMap<String, UserRecord>,
    messages: Mutex<Vec<ChatEntry>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn authenticate_or_create(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Role, StorageError> {
        let existing = self.users.get(username).map(|r| r.value().clone());

        let record = match existing {
            Some(record) => record,
            None => {
                let password_hash = hash_password(password).await?;
                match self.users.entry(username.to_owned()) {
                    Entry::Vacant(slot) => {
                        slot.insert(UserRecord {
                            password_hash,
                            role: Role::default(),
                        });
                        return Ok(Role::default());
                    }
                    // Someone registered the same name while we were hashing.
                    Entry::Occupied(slot) => slot.get().clone(),
                }
            }
        };

        if verify_password(password, &record.password_hash).await? {
            Ok(record.role)
        } else {
            Err(StorageError::InvalidCredentials)
        }
    }

    async fn insert_message(&self, entry: &ChatEntry) -> Result<(), StorageError> {
        self.messages.lock().await.push(entry.clone());
        Ok(())
    }

    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatEntry>, StorageError> {
        let messages = self.messages.lock().await;
        Ok(messages.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn update_role(&self, username: &str, role: Role) -> Result<(), StorageError> {
        match self.users.get_mut(username) {
            Some(mut record) => {
                record.role = role;
                Ok(())
            }
            None => Err(StorageError::UnknownUser(username.to_owned())),
        }
    }

    async fn ensure_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), StorageError> {
        let password_hash = hash_password(password).await?;
        self.users
            .insert(username.to_owned(), UserRecord { password_hash, role });
        Ok(())
    }
}
