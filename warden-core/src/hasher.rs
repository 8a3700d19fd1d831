//! Slow password hashing
//!
//! Services only see the [`PasswordHasher`] trait. The default implementation,
//! [`Argon2PasswordHasher`], produces Argon2id PHC strings and runs on the
//! blocking thread pool so a login never stalls the async runtime.

use argon2::{
    Algorithm, Argon2, Params, PasswordHasher as _, PasswordVerifier as _, Version,
    password_hash::{PasswordHash, SaltString},
};
use async_trait::async_trait;
use tokio::task;

use crate::{Error, crypto::random_bytes, error::CryptoError};

const SALT_BYTES: usize = 16;

/// One-way, salted, deliberately slow hash of a plaintext password.
#[async_trait]
pub trait PasswordHasher: Send + Sync + 'static {
    async fn hash(&self, plaintext: &str) -> Result<String, Error>;

    /// Returns `Ok(false)` for a mismatch and for a digest this hasher cannot parse.
    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, Error>;
}

#[derive(Debug, Clone)]
pub struct Argon2PasswordHasher {
    params: Params,
}

impl Argon2PasswordHasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Cost parameters in KiB of memory, iterations and lanes.
    pub fn with_cost(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self, Error> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
        Ok(Self::new(params))
    }

    fn argon2(params: Params) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
    }
}

impl Default for Argon2PasswordHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

#[async_trait]
impl PasswordHasher for Argon2PasswordHasher {
    async fn hash(&self, plaintext: &str) -> Result<String, Error> {
        let salt_bytes = random_bytes(SALT_BYTES)?;
        let plaintext = plaintext.to_owned();
        let params = self.params.clone();

        task::spawn_blocking(move || {
            let salt = SaltString::encode_b64(&salt_bytes)
                .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
            let hash = Self::argon2(params)
                .hash_password(plaintext.as_bytes(), &salt)
                .map_err(|e| CryptoError::PasswordHash(e.to_string()))?;
            Ok::<String, Error>(hash.to_string())
        })
        .await
        .map_err(|e| CryptoError::PasswordHash(format!("hashing task failed: {e}")))?
    }

    async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, Error> {
        let plaintext = plaintext.to_owned();
        let digest = digest.to_owned();
        let params = self.params.clone();

        let verified = task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&digest) else {
                tracing::debug!("Stored password hash is not a valid PHC string");
                return false;
            };
            Self::argon2(params)
                .verify_password(plaintext.as_bytes(), &parsed)
                .is_ok()
        })
        .await
        .map_err(|e| CryptoError::PasswordHash(format!("verification task failed: {e}")))?;

        Ok(verified)
    }
}
