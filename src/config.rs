//! Gateway configuration.
//!
//! `AuthConfig` is built once at startup (from CLI flags, environment
//! variables, or a JSON file) and handed to the gate by reference. Nothing
//! mutates it afterwards.

use std::fmt;
use std::path::Path;
use std::time::Duration;
use std::{env, fs};

use anyhow::{Context, bail};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use url::Url;

use crate::types::IssuerDomain;

/// Default timeout for a key-set fetch, in seconds.
pub const DEFAULT_JWKS_TIMEOUT_SECONDS: u64 = 5;

/// Authentication configuration.
#[derive(Clone, Deserialize)]
pub struct AuthConfig {
    /// Identity provider tenant host; the issuer is `https://{domain}/`
    pub issuer_domain: IssuerDomain,
    /// Audience every token must carry
    pub audience: String,
    /// Signature algorithms a token may be verified with
    #[serde(default = "default_algorithms")]
    pub algorithms: Vec<Algorithm>,
    /// Static API key accepted in the X-API-Key header
    #[serde(default)]
    pub api_key: Option<String>,
    /// Override for the key-set location (defaults to the issuer's well-known URL)
    #[serde(default)]
    pub jwks_url: Option<String>,
    /// Timeout for a single key-set fetch
    #[serde(default = "default_jwks_timeout_seconds")]
    pub jwks_timeout_seconds: u64,
    /// Key-set cache TTL in seconds; 0 fetches on every verification
    #[serde(default)]
    pub jwks_cache_seconds: u64,
}

fn default_algorithms() -> Vec<Algorithm> {
    vec![Algorithm::RS256]
}

fn default_jwks_timeout_seconds() -> u64 {
    DEFAULT_JWKS_TIMEOUT_SECONDS
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("issuer_domain", &self.issuer_domain)
            .field("audience", &self.audience)
            .field("algorithms", &self.algorithms)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("jwks_url", &self.jwks_url)
            .field("jwks_timeout_seconds", &self.jwks_timeout_seconds)
            .field("jwks_cache_seconds", &self.jwks_cache_seconds)
            .finish()
    }
}

impl AuthConfig {
    /// Create a config for the given tenant and audience with default settings.
    pub fn new(issuer_domain: impl Into<IssuerDomain>, audience: impl Into<String>) -> Self {
        Self {
            issuer_domain: issuer_domain.into(),
            audience: audience.into(),
            algorithms: default_algorithms(),
            api_key: None,
            jwks_url: None,
            jwks_timeout_seconds: DEFAULT_JWKS_TIMEOUT_SECONDS,
            jwks_cache_seconds: 0,
        }
    }

    /// Accept the given static API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Fetch signing keys from `url` instead of the issuer's well-known location.
    pub fn with_jwks_url(mut self, url: impl Into<String>) -> Self {
        self.jwks_url = Some(url.into());
        self
    }

    /// Cache fetched key sets for `seconds`.
    pub fn with_jwks_cache_seconds(mut self, seconds: u64) -> Self {
        self.jwks_cache_seconds = seconds;
        self
    }

    /// Expected value of the `iss` claim.
    pub fn issuer(&self) -> String {
        self.issuer_domain.issuer()
    }

    /// Resolved key-set endpoint.
    pub fn jwks_endpoint(&self) -> anyhow::Result<Url> {
        match &self.jwks_url {
            Some(url) => Url::parse(url).with_context(|| format!("invalid jwks_url `{}`", url)),
            None => self.issuer_domain.jwks_url().with_context(|| {
                format!("cannot derive key-set URL from domain `{}`", self.issuer_domain)
            }),
        }
    }

    pub fn jwks_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_timeout_seconds)
    }

    /// Key-set cache TTL, or `None` when every verification fetches.
    pub fn jwks_cache_ttl(&self) -> Option<Duration> {
        (self.jwks_cache_seconds > 0).then(|| Duration::from_secs(self.jwks_cache_seconds))
    }

    /// Check the config before the gate is built.
    ///
    /// Only RSA-family algorithms are accepted: key-set entries carry RSA
    /// components, and an HMAC entry here would let a token choose a shared
    /// secret scheme.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.issuer_domain.as_str().trim().is_empty() {
            bail!("issuer domain must not be empty");
        }
        if self.audience.trim().is_empty() {
            bail!("audience must not be empty");
        }
        if self.algorithms.is_empty() {
            bail!("at least one signature algorithm must be allowed");
        }
        if let Some(alg) = self.algorithms.iter().find(|alg| !is_rsa_family(**alg)) {
            bail!("algorithm {:?} is not supported for key-set verification", alg);
        }
        if self.jwks_timeout_seconds == 0 {
            bail!("jwks_timeout_seconds must be greater than zero");
        }
        if self.api_key.as_deref().is_some_and(|k| k.is_empty()) {
            bail!("api_key must not be empty when set");
        }
        self.jwks_endpoint()?;
        Ok(())
    }

    /// Load a config from a JSON file, expanding `${VAR}` in string values.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let mut value: serde_json::Value = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        expand_value(&mut value);
        let config = serde_json::from_value(value)
            .with_context(|| format!("invalid config in {}", path.display()))?;
        Ok(config)
    }
}

/// Parse a comma-separated algorithm list such as `RS256,PS256`.
pub fn parse_algorithms(input: &str) -> anyhow::Result<Vec<Algorithm>> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<Algorithm>()
                .map_err(|e| anyhow::anyhow!("unknown algorithm `{}`: {}", s, e))
        })
        .collect()
}

fn is_rsa_family(alg: Algorithm) -> bool {
    matches!(
        alg,
        Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512
    )
}

fn expand_value(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = expand_env_vars(s),
        serde_json::Value::Array(items) => items.iter_mut().for_each(expand_value),
        serde_json::Value::Object(map) => map.values_mut().for_each(expand_value),
        _ => {}
    }
}

fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            match env::var(&name) {
                Ok(val) => out.push_str(&val),
                Err(_) => {
                    out.push_str("${");
                    out.push_str(&name);
                    out.push('}');
                }
            }
        } else {
            out.push(ch);
        }
    }

    out
}
