//! The authentication gate every protected endpoint runs first.

use std::sync::Arc;

use anyhow::Context;
use http::HeaderMap;
use tracing::{debug, warn};

use crate::auth::api_key::ApiKeyValidator;
use crate::auth::credential::Credential;
use crate::auth::error::AuthFailure;
use crate::auth::jwks::{CachedKeySet, KeySetSource, RemoteKeySet};
use crate::auth::principal::Principal;
use crate::auth::verifier::TokenVerifier;
use crate::config::AuthConfig;

/// Decides per request which credential was presented and validates it.
///
/// Stateless across requests apart from the optional key-set cache, so one
/// instance is shared by all handlers.
pub struct AuthGate {
    verifier: TokenVerifier,
    api_keys: ApiKeyValidator,
}

impl AuthGate {
    /// Build a gate that fetches signing keys from the configured provider.
    pub fn new(config: &AuthConfig) -> anyhow::Result<Self> {
        let url = config.jwks_endpoint()?;
        let remote = RemoteKeySet::new(url, config.jwks_timeout())
            .context("failed to build HTTP client for key-set fetches")?;

        let keys: Arc<dyn KeySetSource> = match config.jwks_cache_ttl() {
            Some(ttl) => Arc::new(CachedKeySet::new(Arc::new(remote), ttl)),
            None => Arc::new(remote),
        };

        Ok(Self::with_key_source(config, keys))
    }

    /// Build a gate around an explicit key-set source.
    pub fn with_key_source(config: &AuthConfig, keys: Arc<dyn KeySetSource>) -> Self {
        Self {
            verifier: TokenVerifier::new(config, keys),
            api_keys: ApiKeyValidator::new(config.api_key.as_deref()),
        }
    }

    /// Authenticate a request from its headers.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<Principal, AuthFailure> {
        self.authenticate_credential(Credential::from_headers(headers))
            .await
    }

    /// Authenticate an already-extracted credential.
    ///
    /// A bearer token commits the request to token verification: its failure
    /// is returned as is and no API key is consulted.
    pub async fn authenticate_credential(
        &self,
        credential: Option<Credential>,
    ) -> Result<Principal, AuthFailure> {
        let scheme = credential.as_ref().map(Credential::scheme);

        let result = match credential {
            Some(Credential::BearerToken(token)) => self.verifier.verify(&token).await,
            Some(Credential::ApiKey(key)) => self.api_keys.validate(&key),
            None => Err(AuthFailure::NoCredentialPresented(
                "no bearer token or X-API-Key header".to_string(),
            )),
        };

        match &result {
            Ok(principal) => debug!(
                scheme = scheme.unwrap_or("none"),
                subject = principal.subject().unwrap_or("<none>"),
                "Request authenticated"
            ),
            Err(failure) => warn!(
                scheme = scheme.unwrap_or("none"),
                kind = failure.kind(),
                detail = %failure,
                "Request rejected"
            ),
        }

        result
    }
}
