//! Bearer token verification against the identity provider's key set.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, Validation, decode, decode_header};
use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::error::AuthFailure;
use crate::auth::jwks::KeySetSource;
use crate::auth::principal::Principal;
use crate::config::AuthConfig;

/// Verifies signed tokens: signature, expiry, audience, issuer.
pub struct TokenVerifier {
    keys: Arc<dyn KeySetSource>,
    validation: Validation,
}

impl TokenVerifier {
    /// Build a verifier for `config` that takes signing keys from `keys`.
    ///
    /// The algorithm allow-list comes from the config only; a token's own
    /// `alg` header must be on it.
    pub fn new(config: &AuthConfig, keys: Arc<dyn KeySetSource>) -> Self {
        let first = config.algorithms.first().copied().unwrap_or(Algorithm::RS256);
        let mut validation = Validation::new(first);
        validation.algorithms = config.algorithms.clone();
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.set_audience(&[config.audience.as_str()]);
        validation.set_issuer(&[config.issuer()]);
        validation.set_required_spec_claims(&["exp", "aud", "iss"]);

        Self { keys, validation }
    }

    /// Verify `token` and return its claims as the principal.
    pub async fn verify(&self, token: &str) -> Result<Principal, AuthFailure> {
        let key_set = self.keys.key_set().await?;

        let header = decode_header(token)
            .map_err(|e| AuthFailure::MalformedToken(format!("invalid token header: {}", e)))?;
        let kid = header.kid.ok_or_else(|| {
            AuthFailure::MalformedToken("token header has no key id".to_string())
        })?;

        let signing_key = key_set.find(&kid).ok_or_else(|| {
            AuthFailure::KeyNotFound(format!("no published key with kid `{}`", kid))
        })?;
        let decoding_key = signing_key.decoding_key()?;

        let data = decode::<Map<String, Value>>(token, &decoding_key, &self.validation)
            .map_err(classify)?;
        let claims = data.claims;

        // Strictly in the future: a token expiring this very second is done.
        let now = Utc::now().timestamp();
        match claims.get("exp").and_then(Value::as_f64) {
            Some(exp) if exp > now as f64 => {}
            Some(exp) => {
                return Err(AuthFailure::Expired(format!(
                    "expired at {}, now {}",
                    exp, now
                )));
            }
            None => {
                return Err(AuthFailure::ClaimsMismatch(
                    "exp claim is not a number".to_string(),
                ));
            }
        }

        debug!(kid = %kid, "Token verified");
        Ok(Principal::from_claims(claims))
    }
}

/// Map a jsonwebtoken failure onto the gate's taxonomy.
fn classify(err: JwtError) -> AuthFailure {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthFailure::Expired("exp is in the past".to_string()),
        ErrorKind::InvalidAudience => {
            AuthFailure::ClaimsMismatch("audience does not match".to_string())
        }
        ErrorKind::InvalidIssuer => AuthFailure::ClaimsMismatch("issuer does not match".to_string()),
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthFailure::ClaimsMismatch(format!("missing required claim `{}`", claim))
        }
        ErrorKind::InvalidClaimFormat(claim) => {
            AuthFailure::ClaimsMismatch(format!("claim `{}` has the wrong type", claim))
        }
        ErrorKind::ImmatureSignature => {
            AuthFailure::ClaimsMismatch("token is not valid yet".to_string())
        }
        ErrorKind::InvalidSignature => {
            AuthFailure::InvalidSignature("signature does not verify".to_string())
        }
        ErrorKind::InvalidAlgorithm => {
            AuthFailure::InvalidSignature("token algorithm is not allowed".to_string())
        }
        ErrorKind::InvalidRsaKey(_) | ErrorKind::InvalidKeyFormat => {
            AuthFailure::KeyFetchError(format!("published key is unusable: {}", err))
        }
        _ => AuthFailure::MalformedToken(err.to_string()),
    }
}
