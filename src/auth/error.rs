//! Authentication failure taxonomy.
//!
//! Every rejection the gate produces is one of these variants. They all
//! render the same way over HTTP (401 with a `WWW-Authenticate: Bearer`
//! challenge); only the detail text differs.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Why a request could not be authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// Neither a bearer token nor an API key header was found.
    #[error("Missing authentication credentials: {0}")]
    NoCredentialPresented(String),

    /// The bearer value is not a well-formed signed token.
    #[error("Unable to parse authentication token: {0}")]
    MalformedToken(String),

    /// The key-set endpoint was unreachable or returned unusable content.
    #[error("Unable to fetch signing keys: {0}")]
    KeyFetchError(String),

    /// The token's key identifier is not in the fetched key set.
    #[error("Unable to find appropriate key: {0}")]
    KeyNotFound(String),

    #[error("Invalid token signature: {0}")]
    InvalidSignature(String),

    #[error("Token is expired: {0}")]
    Expired(String),

    /// Audience or issuer does not match the configuration.
    #[error("Incorrect claims, check audience and issuer: {0}")]
    ClaimsMismatch(String),

    #[error("Invalid API key: {0}")]
    InvalidApiKey(String),
}

impl AuthFailure {
    /// Stable tag for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoCredentialPresented(_) => "no_credential_presented",
            Self::MalformedToken(_) => "malformed_token",
            Self::KeyFetchError(_) => "key_fetch_error",
            Self::KeyNotFound(_) => "key_not_found",
            Self::InvalidSignature(_) => "invalid_signature",
            Self::Expired(_) => "expired",
            Self::ClaimsMismatch(_) => "claims_mismatch",
            Self::InvalidApiKey(_) => "invalid_api_key",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AuthFailure {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            detail: self.to_string(),
        };
        let mut response = (StatusCode::UNAUTHORIZED, Json(body)).into_response();
        response
            .headers_mut()
            .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        response
    }
}
