//! bcrypt hashing off the async runtime

use crate::error::{Error, Result};

/// Hash `password` with the given bcrypt cost
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| Error::Internal(format!("hashing task failed: {}", e)))?
        .map_err(|e| Error::Internal(format!("password hashing failed: {}", e)))
}

/// Check `password` against a stored hash. Malformed hashes never verify.
pub async fn verify_password(password: &str, hash: &str) -> bool {
    let password = password.to_string();
    let hash = hash.to_string();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .unwrap_or(false)
}
