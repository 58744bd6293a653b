//! JWKS (JSON Web Key Set) fetching and caching.
//!
//! The verifier asks a [`KeySetSource`] for the identity provider's current
//! signing keys. [`RemoteKeySet`] fetches on every call; [`CachedKeySet`]
//! wraps any source with a bounded TTL.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Duration, Instant};

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};
use url::Url;

use crate::auth::error::AuthFailure;
use crate::types::KeyId;

/// A single signing key from a JWKS document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SigningKey {
    /// Key ID, matched against the token header's `kid`
    #[serde(default)]
    pub kid: Option<KeyId>,
    /// Key type (e.g., "RSA")
    #[serde(default)]
    pub kty: String,
    /// Key use (e.g., "sig" for signature)
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,
    /// RSA modulus (base64url encoded)
    #[serde(default)]
    pub n: Option<String>,
    /// RSA exponent (base64url encoded)
    #[serde(default)]
    pub e: Option<String>,
}

impl SigningKey {
    /// Rebuild the RSA public key from its published components.
    ///
    /// Unusable key material is reported as a key-fetch problem, since the
    /// provider published it.
    pub fn decoding_key(&self) -> Result<DecodingKey, AuthFailure> {
        let kid = self.kid.as_ref().map(KeyId::as_str).unwrap_or("<none>");

        if self.kty != "RSA" {
            return Err(AuthFailure::KeyFetchError(format!(
                "key `{}` has unsupported type `{}`",
                kid, self.kty
            )));
        }
        if self.key_use.as_deref() == Some("enc") {
            return Err(AuthFailure::KeyFetchError(format!(
                "key `{}` is an encryption key",
                kid
            )));
        }

        let n = self.n.as_deref().ok_or_else(|| {
            AuthFailure::KeyFetchError(format!("key `{}` is missing 'n'", kid))
        })?;
        let e = self.e.as_deref().ok_or_else(|| {
            AuthFailure::KeyFetchError(format!("key `{}` is missing 'e'", kid))
        })?;

        DecodingKey::from_rsa_components(n, e).map_err(|err| {
            AuthFailure::KeyFetchError(format!("key `{}` has invalid RSA components: {}", kid, err))
        })
    }
}

/// A JWKS document, in published order.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SigningKeySet {
    pub keys: Vec<SigningKey>,
}

impl SigningKeySet {
    pub fn new(keys: Vec<SigningKey>) -> Self {
        Self { keys }
    }

    /// First key whose `kid` equals `kid`. Entries without a `kid` never match.
    pub fn find(&self, kid: &str) -> Option<&SigningKey> {
        self.keys
            .iter()
            .find(|key| key.kid.as_ref().is_some_and(|k| k.as_str() == kid))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Future returned by [`KeySetSource::key_set`].
pub type KeySetFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Arc<SigningKeySet>, AuthFailure>> + Send + 'a>>;

/// Where the verifier gets signing keys from.
pub trait KeySetSource: Send + Sync {
    /// Current key set, or `KeyFetchError`.
    fn key_set(&self) -> KeySetFuture<'_>;
}

/// Fetches the key set over HTTP on every call. No retries.
pub struct RemoteKeySet {
    /// The JWKS endpoint URL.
    url: Url,
    /// HTTP client with the request timeout applied.
    client: reqwest::Client,
}

impl RemoteKeySet {
    /// Create a fetcher for `url`; every request is bounded by `timeout`.
    pub fn new(url: Url, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Fetch and parse the key set.
    pub async fn fetch(&self) -> Result<SigningKeySet, AuthFailure> {
        debug!("Fetching JWKS from {}", self.url);

        let response = self
            .client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| {
                warn!(url = %self.url, error = %e, "JWKS request failed");
                AuthFailure::KeyFetchError(format!("request to {} failed: {}", self.url, e))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url = %self.url, %status, "JWKS endpoint returned error");
            return Err(AuthFailure::KeyFetchError(format!(
                "HTTP {} from {}",
                status, self.url
            )));
        }

        let key_set: SigningKeySet = response.json().await.map_err(|e| {
            warn!(url = %self.url, error = %e, "JWKS response could not be parsed");
            AuthFailure::KeyFetchError(format!("unparsable key set from {}: {}", self.url, e))
        })?;

        debug!("Fetched {} keys from {}", key_set.len(), self.url);
        Ok(key_set)
    }
}

impl KeySetSource for RemoteKeySet {
    fn key_set(&self) -> KeySetFuture<'_> {
        Box::pin(async move { self.fetch().await.map(Arc::new) })
    }
}

/// Cached key set with its fetch time.
struct CachedEntry {
    keys: Arc<SigningKeySet>,
    fetched_at: Instant,
}

/// TTL-bounded cache in front of another key-set source.
///
/// An entry older than the TTL is never served, so a key the provider stops
/// publishing is rejected at most one TTL later. Failed refreshes are not
/// masked by stale data. Concurrent refreshes collapse to a single fetch.
pub struct CachedKeySet {
    inner: Arc<dyn KeySetSource>,
    ttl: Duration,
    entry: RwLock<Option<CachedEntry>>,
    /// Held while a refresh is in flight.
    refresh: Mutex<()>,
}

impl CachedKeySet {
    pub fn new(inner: Arc<dyn KeySetSource>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entry: RwLock::new(None),
            refresh: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Drop the cached set; the next call fetches.
    pub async fn invalidate(&self) {
        *self.entry.write().await = None;
    }

    async fn fresh(&self) -> Option<Arc<SigningKeySet>> {
        let entry = self.entry.read().await;
        entry
            .as_ref()
            .filter(|e| e.fetched_at.elapsed() < self.ttl)
            .map(|e| e.keys.clone())
    }

    async fn get(&self) -> Result<Arc<SigningKeySet>, AuthFailure> {
        if let Some(keys) = self.fresh().await {
            return Ok(keys);
        }

        let _refresh = self.refresh.lock().await;

        // Another task may have refreshed while we waited for the lock.
        if let Some(keys) = self.fresh().await {
            debug!("JWKS refreshed by concurrent request");
            return Ok(keys);
        }

        let keys = self.inner.key_set().await?;
        *self.entry.write().await = Some(CachedEntry {
            keys: keys.clone(),
            fetched_at: Instant::now(),
        });
        debug!("JWKS cache refreshed with {} keys", keys.len());
        Ok(keys)
    }
}

impl KeySetSource for CachedKeySet {
    fn key_set(&self) -> KeySetFuture<'_> {
        Box::pin(self.get())
    }
}
