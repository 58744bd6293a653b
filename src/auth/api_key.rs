//! Static API key validation.

use sha2::{Digest, Sha256};

use crate::auth::error::AuthFailure;
use crate::auth::principal::Principal;

/// Checks a presented API key against the configured secret.
///
/// Only the SHA-256 digest of the secret is kept. Comparing fixed-length
/// digests in constant time leaks neither the matching prefix nor the
/// secret's length.
pub struct ApiKeyValidator {
    expected: Option<[u8; 32]>,
}

impl ApiKeyValidator {
    /// `None` rejects every key.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            expected: secret.map(digest),
        }
    }

    /// Return the internal-extension principal if `key` is the secret.
    pub fn validate(&self, key: &str) -> Result<Principal, AuthFailure> {
        let Some(expected) = &self.expected else {
            return Err(AuthFailure::InvalidApiKey(
                "API key authentication is not configured".to_string(),
            ));
        };

        if constant_time_eq(&digest(key), expected) {
            Ok(Principal::internal_extension())
        } else {
            Err(AuthFailure::InvalidApiKey(
                "presented key does not match".to_string(),
            ))
        }
    }
}

fn digest(value: &str) -> [u8; 32] {
    Sha256::digest(value.as_bytes()).into()
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
