//! Authentication gate for the telemetry endpoints.
//!
//! Every protected request carries one of two credentials:
//!
//! - **Bearer token**: a JWT signed by the identity provider, verified against
//!   the provider's published key set (`https://{domain}/.well-known/jwks.json`)
//! - **API key**: the browser extension's static key in the `X-API-Key` header
//!
//! ## Priority
//!
//! A bearer token, once present, is the only thing checked. If it fails, the
//! request is rejected even when a valid API key is also attached. Without a
//! bearer token the API key is checked; without either the gate fails closed.
//!
//! ## Usage
//!
//! ```ignore
//! let gate = AuthGate::new(&config)?;
//! let principal = gate.authenticate(&headers).await?;
//! ```

mod api_key;
mod credential;
mod error;
mod gate;
pub mod jwks;
mod principal;
#[cfg(test)]
pub(crate) mod testutil;
mod verifier;

pub use api_key::ApiKeyValidator;
pub use credential::{API_KEY_HEADER, Credential};
pub use error::AuthFailure;
pub use gate::AuthGate;
pub use jwks::{CachedKeySet, KeySetSource, RemoteKeySet, SigningKey, SigningKeySet};
pub use principal::{INTERNAL_SCOPE, INTERNAL_SUBJECT, Principal};
pub use verifier::TokenVerifier;
