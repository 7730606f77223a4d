use crate::storage::{Storage, StorageError, hash_password, verify_password};
use async_trait::async_trait;
use chorus_core::{ChatEntry, Role};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::info;

/// SQLite-backed storage. Tables are created on connect.
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Opens (creating if missing) the database at `url`, e.g.
    /// `sqlite://chorus.db`.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        let storage = Self { pool };
        storage.migrate().await?;
        info!("Connected to SQLite storage at {}", url);
        Ok(storage)
    }

    async fn migrate(&self) -> Result<(), StorageError> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'peasant',
                password TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                sender TEXT NOT NULL,
                role TEXT NOT NULL,
                type TEXT NOT NULL,
                content TEXT NOT NULL,
                timestamp TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    fn row_to_entry(row: &SqliteRow) -> Result<ChatEntry, StorageError> {
        Ok(ChatEntry {
            sender: row.try_get("sender")?,
            role: parse_role(row.try_get("role")?)?,
            kind: row.try_get("type")?,
            content: row.try_get("content")?,
        })
    }
}

fn parse_role(raw: String) -> Result<Role, StorageError> {
    Role::from_str(&raw).map_err(|e| StorageError::Corrupt(e.to_string()))
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn authenticate_or_create(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Role, StorageError> {
        loop {
            let row = sqlx::query("SELECT role, password FROM users WHERE username = ?")
                .bind(username)
                .fetch_optional(&self.pool)
                .await?;

            if let Some(row) = row {
                let hash: String = row.try_get("password")?;
                if !verify_password(password, &hash).await? {
                    return Err(StorageError::InvalidCredentials);
                }
                return parse_role(row.try_get("role")?);
            }

            let hash = hash_password(password).await?;
            let inserted = sqlx::query(
                "INSERT INTO users (username, role, password) VALUES (?, ?, ?) \
                 ON CONFLICT(username) DO NOTHING",
            )
            .bind(username)
            .bind(Role::default().as_str())
            .bind(&hash)
            .execute(&self.pool)
            .await?;

            if inserted.rows_affected() == 1 {
                info!("Created user {}", username);
                return Ok(Role::default());
            }
            // Lost a race with a concurrent first login; verify against theirs.
        }
    }

    async fn insert_message(&self, entry: &ChatEntry) -> Result<(), StorageError> {
        sqlx::query("INSERT INTO messages (sender, role, type, content) VALUES (?, ?, ?, ?)")
            .bind(&entry.sender)
            .bind(entry.role.as_str())
            .bind(&entry.kind)
            .bind(&entry.content)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn recent_messages(&self, limit: u32) -> Result<Vec<ChatEntry>, StorageError> {
        let rows = sqlx::query(
            "SELECT sender, role, type, content FROM messages ORDER BY id DESC LIMIT ?",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn update_role(&self, username: &str, role: Role) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE users SET role = ? WHERE username = ?")
            .bind(role.as_str())
            .bind(username)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::UnknownUser(username.to_owned()));
        }
        Ok(())
    }

    async fn ensure_user(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> Result<(), StorageError> {
        let hash = hash_password(password).await?;
        sqlx::query(
            "INSERT INTO users (username, role, password) VALUES (?, ?, ?) \
             ON CONFLICT(username) DO UPDATE SET role = excluded.role, password = excluded.password",
        )
        .bind(username)
        .bind(role.as_str())
        .bind(&hash)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
