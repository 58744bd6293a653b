//! Credential extraction from request headers.

use std::fmt;

use http::HeaderMap;
use http::header::AUTHORIZATION;

/// Header carrying the static API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// The single credential a request is authenticated with.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Value of `Authorization: Bearer <token>`
    BearerToken(String),
    /// Value of the `X-API-Key` header
    ApiKey(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
            Self::ApiKey(_) => f.write_str("ApiKey(<redacted>)"),
        }
    }
}

impl Credential {
    /// Pick the credential a request presents.
    ///
    /// A bearer token wins whenever one is structurally present, even if an
    /// API key header is also sent. Empty API key values, or ones that are not
    /// visible ASCII, count as absent.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        if let Some(token) = bearer_token(headers) {
            return Some(Self::BearerToken(token));
        }

        headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(|v| Self::ApiKey(v.to_string()))
    }

    /// Name of the scheme, for logging.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::BearerToken(_) => "bearer",
            Self::ApiKey(_) => "api_key",
        }
    }
}

/// Token from an `Authorization` header whose scheme is `Bearer` (any case).
///
/// The scheme is matched on raw bytes so a token carrying non-ASCII bytes is
/// still a token; it is decoded lossily and fails verification later.
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.as_bytes();
    let space = value.iter().position(|b| *b == b' ')?;
    if !value[..space].eq_ignore_ascii_case(b"bearer") {
        return None;
    }
    let credentials = String::from_utf8_lossy(&value[space + 1..]);
    let credentials = credentials.trim();
    (!credentials.is_empty()).then(|| credentials.to_string())
}
