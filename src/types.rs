//! NewType wrappers for strong typing across the gateway.
//!
//! These types keep identifiers from the identity provider apart from the
//! free-form strings that flow through requests.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Wraps a `String` with the conversions the gateway actually uses.
macro_rules! newtype_string {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

newtype_string!(
    /// Key identifier (`kid`) shared by a token header and a key-set entry.
    KeyId
);

newtype_string!(
    /// Host name of the identity provider tenant (e.g., "tenant.example").
    ///
    /// Both the expected token issuer and the published key-set location are
    /// derived from this value.
    IssuerDomain
);

impl IssuerDomain {
    /// Expected `iss` claim: `https://{domain}/`.
    pub fn issuer(&self) -> String {
        format!("https://{}/", self.0)
    }

    /// Location of the provider's published signing keys.
    pub fn jwks_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.issuer())?.join(".well-known/jwks.json")
    }
}
