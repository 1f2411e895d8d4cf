use argon2::{
    password_hash::{PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::HashingConfig;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid hashing parameters: {0}")]
    Params(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("malformed password hash: {0}")]
    Malformed(String),
    #[error("hashing task failed: {0}")]
    Task(String),
}

/// Argon2id hashing with a fixed work factor.
///
/// Keeps a decoy digest so callers can spend the same verification time on
/// logins for unknown accounts as on wrong passwords.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    decoy: String,
}

impl PasswordHasher {
    pub fn new(cfg: &HashingConfig) -> Result<Self, PasswordError> {
        let params = Params::new(cfg.memory_kib, cfg.iterations, cfg.parallelism, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
        let mut hasher = Self {
            argon2,
            decoy: String::new(),
        };
        hasher.decoy = hasher.hash("decoy-password-never-matches")?;
        Ok(hasher)
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                PasswordError::Hash(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// `Ok(false)` on mismatch, `Err` only when `hash` is not a PHC string.
    pub fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            PasswordError::Malformed(e.to_string())
        })?;
        Ok(self
            .argon2
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    pub fn verify_decoy(&self, plain: &str) {
        let _ = self.verify(plain, &self.decoy);
    }

    /// [`Self::hash`] on the blocking pool, keeping Argon2 off the async
    /// workers.
    pub async fn hash_async(&self, plain: &str) -> Result<String, PasswordError> {
        let hasher = self.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .map_err(join_error)?
    }

    pub async fn verify_async(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        let hasher = self.clone();
        let (plain, hash) = (plain.to_owned(), hash.to_owned());
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .map_err(join_error)?
    }

    pub async fn verify_decoy_async(&self, plain: &str) {
        let hasher = self.clone();
        let plain = plain.to_owned();
        if let Err(e) = tokio::task::spawn_blocking(move || hasher.verify_decoy(&plain)).await {
            error!(error = %e, "decoy verify task failed");
        }
    }
}

fn join_error(e: tokio::task::JoinError) -> PasswordError {
    error!(error = %e, "password task join error");
    PasswordError::Task(e.to_string())
}

#[cfg(test)]
pub(crate) fn cheap_hashing() -> HashingConfig {
    HashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}
