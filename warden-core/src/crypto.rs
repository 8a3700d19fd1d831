//! Token randomness and digests
//!
//! Raw reset tokens and session ids come straight from the operating system
//! RNG. Reset tokens are stored only as a SHA-256 digest: they carry 256 bits
//! of entropy and are single-use, so a fast deterministic digest is enough to
//! make the stored value useless to a reader of the database, and it lets the
//! store look a token up by digest. Passwords never go through this module;
//! they use the slow [`PasswordHasher`](crate::hasher::PasswordHasher).

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::{TryRngCore, rngs::OsRng};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::{Error, error::CryptoError};

/// Raw reset token entropy (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Fill a buffer of `len` bytes from the OS RNG.
pub fn random_bytes(len: usize) -> Result<Vec<u8>, Error> {
    let mut bytes = vec![0u8; len];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| CryptoError::RandomSource(e.to_string()))?;
    Ok(bytes)
}

/// Generate a URL-safe raw token with 256 bits of entropy (43 characters).
pub fn generate_secure_token() -> Result<String, Error> {
    Ok(BASE64_URL_SAFE_NO_PAD.encode(random_bytes(TOKEN_BYTES)?))
}

/// Hex-encoded SHA-256 of a raw token. Deterministic, so usable as a lookup key.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
