use crate::storage::StorageError;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tokio::task;

/// Hashes a password into an Argon2id PHC string on a blocking thread.
pub async fn hash_password(password: &str) -> Result<String, StorageError> {
    let password = password.to_owned();

    task::spawn_blocking(move || {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| StorageError::Hash(format!("failed to hash password: {e}")))
    })
    .await
    .map_err(|e| StorageError::Hash(format!("password hashing task failed: {e}")))?
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, StorageError> {
    let password = password.to_owned();
    let hash = hash.to_owned();

    task::spawn_blocking(move || {
        let parsed = PasswordHash::new(&hash)
            .map_err(|e| StorageError::Corrupt(format!("invalid password hash: {e}")))?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(StorageError::Hash(format!("password verification failed: {e}"))),
        }
    })
    .await
    .map_err(|e| StorageError::Hash(format!("password verification task failed: {e}")))?
}
