//! Prefixed identifier generation
//!
//! Record ids look like `usr_3q2-7wEjZk8Hc1xA`: a short type prefix followed by
//! URL-safe base64 of OS randomness. Ids that double as bearer secrets (session
//! ids) are generated with more entropy than plain record ids.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};

use crate::{Error, crypto::random_bytes};

/// Entropy for ids that only need to be unique (96 bits).
pub const RECORD_ID_BYTES: usize = 12;

/// Entropy for ids that are also unguessable credentials (256 bits).
pub const SECRET_ID_BYTES: usize = 32;

/// Generate `{prefix}_{base64url(bytes)}` from `bytes` random bytes.
pub fn generate_prefixed_id(prefix: &str, bytes: usize) -> Result<String, Error> {
    let random = random_bytes(bytes.max(RECORD_ID_BYTES))?;
    Ok(format!("{prefix}_{}", BASE64_URL_SAFE_NO_PAD.encode(random)))
}

/// Check that `id` carries `expected_prefix` and at least 96 bits of payload.
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    BASE64_URL_SAFE_NO_PAD
        .decode(random_part)
        .is_ok_and(|decoded| decoded.len() >= RECORD_ID_BYTES)
}
