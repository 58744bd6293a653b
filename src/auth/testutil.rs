//! Shared helpers for authentication tests.
//!
//! Two fixed RSA key pairs live in `testdata/`. Key A is the one published
//! in mock key sets; key B signs forged tokens that reuse key A's `kid`.

#![cfg(test)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::{Map, Value, json};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::auth::error::AuthFailure;
use crate::auth::jwks::{KeySetFuture, KeySetSource, SigningKeySet};
use crate::config::AuthConfig;

pub const KID: &str = "abc";
pub const DOMAIN: &str = "tenant.example";
pub const AUDIENCE: &str = "my-api";
pub const ISSUER: &str = "https://tenant.example/";
pub const API_KEY: &str = "dev-secret-key-change-in-production";

pub const PRIVATE_KEY_A: &str = include_str!("testdata/signing_key_a.pem");
pub const PRIVATE_KEY_B: &str = include_str!("testdata/signing_key_b.pem");

pub const MODULUS_A: &str = "ttpgghbeAR4jOAf013UixGap5td65o_n8N2ek1T6hqaEmAcNjnQ8Ub2fMB4q-nJI3xOfnyfx6yRIp_8-R0XEEhQNM_B8DwAjspasFFYS6oWi4PKPUxvnVaAzGsM2Kh-crQKENjdWXlE-CSz0KngysHpZPUDqTh8Jl0SDiSNY1FtGtPlxvsirsKjI-2rCyYQTIOzY_Ht6vCQG0yXKI6aUZc7YC0RzEPknAAz7PhLPCPXao4O6hU3xBVhdSJmjaNPOKUWndyATkbfNsBcGykdJYxDFFsq5gMpsu07zFGUQ-lNQ2RAtAtHcgN8WWWdS5SXvgxZxuPrh5n5D8EAVQqhpWQ";
pub const MODULUS_B: &str = "nCf0k8Q1dQZ-VmF0UNX8VE4B9_2zyx5j6V7K6Q3OfvYuFzs59NwVWOQpoPsUfrGtibopzm9QiEVaz1uxHNYpCccDqgjtWcp4vRJKp7CPIj9OaD0S2kLUF_ZZTpzEa-ABLJKKfg25Vt6eTm94tETGFCld7cuK-84pw3osZmGYJ9kVRGEEh5bTkaxz0d0OZSF9Z-cQNm7PMTIJf8kXWKFm65Zt3Pg5Ue-MtmXdUH30TlXOY9Pg9cIwC8Gv4ZOZbY8c925P7kfEH9kS8JAHITOIRujB0e7_QBPaPgWDJXVP9iKXI6I_eih4gllvcpnCluifrO8ZA0SRpzPjFCQO9cwhew";
pub const EXPONENT: &str = "AQAB";

/// JWKS entry for an RSA key.
pub fn jwk(kid: &str, modulus: &str) -> Value {
    json!({
        "kid": kid,
        "kty": "RSA",
        "use": "sig",
        "n": modulus,
        "e": EXPONENT
    })
}

/// Claims of a token that passes every check: expires in one hour.
pub fn valid_claims() -> Map<String, Value> {
    let now = Utc::now().timestamp();
    let claims = json!({
        "sub": "auth0|user-1",
        "aud": AUDIENCE,
        "iss": ISSUER,
        "iat": now,
        "exp": now + 3600,
        "scope": "read:logs write:alerts"
    });
    match claims {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

/// `valid_claims()` with `key` replaced.
pub fn claims_with(key: &str, value: Value) -> Map<String, Value> {
    let mut claims = valid_claims();
    claims.insert(key.to_string(), value);
    claims
}

/// Sign `claims` with an RSA private key under RS256.
pub fn sign(claims: &Map<String, Value>, kid: Option<&str>, private_key_pem: &str) -> String {
    sign_with(claims, kid, private_key_pem, Algorithm::RS256)
}

pub fn sign_with(
    claims: &Map<String, Value>,
    kid: Option<&str>,
    private_key_pem: &str,
    alg: Algorithm,
) -> String {
    let mut header = Header::new(alg);
    header.kid = kid.map(str::to_string);
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).unwrap();
    encode(&header, claims, &key).unwrap()
}

/// Mock identity provider publishing `keys` at the well-known path.
pub async fn jwks_server(keys: Vec<Value>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/.well-known/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "keys": keys })))
        .mount(&server)
        .await;
    server
}

pub fn jwks_url(server: &MockServer) -> Url {
    Url::parse(&format!("{}/.well-known/jwks.json", server.uri())).unwrap()
}

/// Config for `tenant.example` / `my-api` whose keys come from `server`.
pub fn config_for(server: &MockServer) -> AuthConfig {
    AuthConfig::new(DOMAIN, AUDIENCE)
        .with_api_key(API_KEY)
        .with_jwks_url(jwks_url(server).to_string())
}

/// In-memory key set.
pub struct StaticKeySet(Arc<SigningKeySet>);

impl StaticKeySet {
    pub fn new(keys: Vec<Value>) -> Self {
        let set: SigningKeySet = serde_json::from_value(json!({ "keys": keys })).unwrap();
        Self(Arc::new(set))
    }

    pub fn single(kid: &str, modulus: &str) -> Self {
        Self::new(vec![jwk(kid, modulus)])
    }
}

impl KeySetSource for StaticKeySet {
    fn key_set(&self) -> KeySetFuture<'_> {
        let keys = self.0.clone();
        Box::pin(async move { Ok(keys) })
    }
}

/// Key-set source that always fails to fetch.
pub struct FailingKeySet;

impl KeySetSource for FailingKeySet {
    fn key_set(&self) -> KeySetFuture<'_> {
        Box::pin(async { Err(AuthFailure::KeyFetchError("connection refused".to_string())) })
    }
}

/// Counts how often the wrapped source is asked, optionally slowly.
pub struct CountingKeySet<S> {
    inner: S,
    calls: AtomicUsize,
    delay: Duration,
}

impl<S: KeySetSource> CountingKeySet<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<S: KeySetSource> KeySetSource for CountingKeySet<S> {
    fn key_set(&self) -> KeySetFuture<'_> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.key_set().await
        })
    }
}
