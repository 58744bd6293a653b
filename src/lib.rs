// Core modules
pub mod api;
pub mod auth;
pub mod config;
pub mod types;

// Re-export key types and functions
pub use api::{AppState, Authenticated, create_router};
pub use auth::{AuthFailure, AuthGate, Credential, Principal};
pub use config::AuthConfig;

use anyhow::Result;
use axum::Router;

/// Convenience function to build the HTTP app for a validated config.
///
/// This builds the AuthGate (with its key-set source) and mounts the routes.
pub fn create_app(config: &AuthConfig) -> Result<Router> {
    config.validate()?;
    let gate = AuthGate::new(config)?;
    Ok(create_router(AppState::new(gate)))
}
