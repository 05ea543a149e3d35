// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Password hashing and reset tokens.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Shortest password accepted at sign-up and reset.
pub const MIN_PASSWORD_LEN: u64 = 8;

/// Hash a password with Argon2id (OWASP parameters: 64 MiB, 3 passes, 4 lanes).
pub fn hash_password(password: &str) -> Result<String, AppError> {
    let params = Params::new(65536, 3, 4, None)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Argon2 params: {}", e)))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
    let salt = SaltString::generate(&mut OsRng);

    Ok(argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?
        .to_string())
}

/// Check a password against a stored PHC hash.
///
/// A malformed stored hash is an internal error, not a wrong password.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Stored hash unreadable: {}", e)))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// A fresh reset token and the hash we store for it.
pub fn new_reset_token() -> (String, String) {
    let token = format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    );
    let hash = hash_reset_token(&token);
    (token, hash)
}

/// SHA-256 of a reset token, hex encoded. Only the hash is persisted.
pub fn hash_reset_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.trim().as_bytes()))
}
