//! The authenticated identity handed to request handlers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Subject of the principal produced by API-key authentication.
pub const INTERNAL_SUBJECT: &str = "internal_extension";

/// Scope of the principal produced by API-key authentication.
pub const INTERNAL_SCOPE: &str = "admin";

/// Claims of an authenticated caller.
///
/// For a verified token this is the token's full claim set; for an API key
/// it is the fixed `{sub: "internal_extension", scope: "admin"}` pair.
/// Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal {
    claims: Map<String, Value>,
}

impl Principal {
    /// Wrap a verified claim set.
    pub fn from_claims(claims: Map<String, Value>) -> Self {
        Self { claims }
    }

    /// The synthetic principal for the extension's static API key.
    pub fn internal_extension() -> Self {
        let mut claims = Map::new();
        claims.insert("sub".to_string(), Value::from(INTERNAL_SUBJECT));
        claims.insert("scope".to_string(), Value::from(INTERNAL_SCOPE));
        Self { claims }
    }

    /// The `sub` claim, if it is a string.
    pub fn subject(&self) -> Option<&str> {
        self.claims.get("sub").and_then(Value::as_str)
    }

    /// The `scope` claim, if it is a string.
    pub fn scope(&self) -> Option<&str> {
        self.claims.get("scope").and_then(Value::as_str)
    }

    /// Whether the space-delimited `scope` claim grants `scope`.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.scope()
            .is_some_and(|s| s.split_whitespace().any(|granted| granted == scope))
    }

    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.claims.get(name)
    }

    pub fn claims(&self) -> &Map<String, Value> {
        &self.claims
    }

    pub fn into_claims(self) -> Map<String, Value> {
        self.claims
    }
}
