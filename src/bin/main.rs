use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::{Level, info, warn};
use tracing_subscriber::EnvFilter;
use telemetry_gateway::config::parse_algorithms;
use telemetry_gateway::{AuthConfig, AuthGate, Credential, create_app};

#[derive(Parser)]
#[command(name = "telemetry-gateway")]
#[command(about = "Telemetry intake for the compliance browser extension")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Bind address, e.g. 0.0.0.0:8000
        #[arg(long, default_value = "0.0.0.0:8000")]
        bind: String,
        #[command(flatten)]
        auth: AuthArgs,
    },
    /// Authenticate one credential and print the resulting principal
    Verify {
        #[command(flatten)]
        auth: AuthArgs,
        /// Bearer token to verify (takes precedence over --key)
        #[arg(long)]
        token: Option<String>,
        /// API key to check
        #[arg(long)]
        key: Option<String>,
    },
}

/// Authentication settings shared by every subcommand.
///
/// Flags and their environment variables override values from `--config`.
#[derive(Args)]
struct AuthArgs {
    /// JSON config file
    #[arg(long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
    /// Identity provider domain, e.g. tenant.example
    #[arg(long, env = "AUTH_DOMAIN")]
    domain: Option<String>,
    /// Audience tokens must be issued for
    #[arg(long, env = "AUTH_AUDIENCE")]
    audience: Option<String>,
    /// Comma-separated signature algorithm allow-list (default RS256)
    #[arg(long, env = "AUTH_ALGORITHMS")]
    algorithms: Option<String>,
    /// Static API key accepted in X-API-Key
    #[arg(long, env = "API_KEY_SECRET", hide_env_values = true)]
    api_key: Option<String>,
    /// Override for the key-set URL
    #[arg(long, env = "AUTH_JWKS_URL")]
    jwks_url: Option<String>,
    /// Timeout for one key-set fetch
    #[arg(long, env = "AUTH_JWKS_TIMEOUT_SECONDS")]
    jwks_timeout_seconds: Option<u64>,
    /// Cache fetched key sets for this long (0 disables the cache)
    #[arg(long, env = "AUTH_JWKS_CACHE_SECONDS")]
    jwks_cache_seconds: Option<u64>,
}

impl AuthArgs {
    /// Build and validate the immutable auth config.
    fn into_config(self) -> Result<AuthConfig> {
        let mut config = match (&self.config, &self.domain, &self.audience) {
            (Some(path), _, _) => {
                info!("Loading auth config from {}", path.display());
                AuthConfig::from_file(path)?
            }
            (None, Some(domain), Some(audience)) => {
                AuthConfig::new(domain.as_str(), audience.as_str())
            }
            (None, _, _) => bail!("either --config or both --domain and --audience are required"),
        };

        if let Some(domain) = self.domain {
            config.issuer_domain = domain.into();
        }
        if let Some(audience) = self.audience {
            config.audience = audience;
        }
        if let Some(algorithms) = self.algorithms {
            config.algorithms = parse_algorithms(&algorithms)?;
        }
        if let Some(key) = self.api_key {
            config.api_key = Some(key);
        }
        if let Some(url) = self.jwks_url {
            config.jwks_url = Some(url);
        }
        if let Some(timeout) = self.jwks_timeout_seconds {
            config.jwks_timeout_seconds = timeout;
        }
        if let Some(ttl) = self.jwks_cache_seconds {
            config.jwks_cache_seconds = ttl;
        }

        config.validate()?;

        if config.api_key.is_none() {
            warn!("No API key configured - X-API-Key requests will be rejected");
        }
        if config.jwks_cache_ttl().is_none() {
            info!("Key-set cache disabled; signing keys are fetched per token");
        }

        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("telemetry_gateway=info".parse()?),
        )
        .with_max_level(Level::INFO)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind, auth } => {
            let config = auth.into_config()?;
            info!(
                "Authenticating tokens from {} for audience {}",
                config.issuer(),
                config.audience
            );

            let app = create_app(&config)?;
            let listener = tokio::net::TcpListener::bind(&bind).await?;
            info!("Telemetry gateway listening on http://{}", bind);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await?;
            info!("Telemetry gateway stopped");
        }
        Commands::Verify { auth, token, key } => {
            let config = auth.into_config()?;
            let gate = AuthGate::new(&config)?;

            let credential = match (token, key) {
                (Some(token), _) => Some(Credential::BearerToken(token)),
                (None, Some(key)) => Some(Credential::ApiKey(key)),
                (None, None) => None,
            };

            match gate.authenticate_credential(credential).await {
                Ok(principal) => println!("{}", serde_json::to_string_pretty(&principal)?),
                Err(failure) => bail!("rejected ({}): {}", failure.kind(), failure),
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
