pub mod comments;
pub mod constants;
pub mod error;
pub mod logging;
pub mod oauth;
pub(crate) mod web;

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use url::Url;

use crate::constants::DEFAULT_OAUTH_HOST;
use crate::error::RelayError;
use crate::oauth::GitHubOAuthClient;

pub use web::build_app;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct CliOpts {
    /// OAuth App client ID
    #[arg(long, env = "GITHUB_CLIENT_ID")]
    pub client_id: String,

    /// OAuth App client secret
    #[arg(long, env = "GITHUB_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: String,

    #[arg(long, env = "RELAY_LISTENER_ADDR", default_value = "127.0.0.1:3000")]
    pub listener_addr: String,

    /// Public URL of this relay, used for the `redirect_uri` instead of the Host header
    #[arg(long, env = "RELAY_PUBLIC_URL")]
    pub public_url: Option<Url>,

    /// Base URL of the OAuth provider
    #[arg(long, env = "RELAY_OAUTH_HOST", default_value = DEFAULT_OAUTH_HOST)]
    pub oauth_host: Url,

    /// Bind the `state` parameter to a session cookie and check it on callback
    #[arg(long, env = "RELAY_VERIFY_STATE", default_value_t = false)]
    pub verify_state: bool,

    /// Token exchange timeout, at least one second
    #[arg(
        long,
        env = "RELAY_UPSTREAM_TIMEOUT_SECS",
        default_value_t = 30,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub upstream_timeout_secs: u64,

    #[arg(long, env = "RELAY_TLS_CERT", requires = "tls_key")]
    pub tls_cert: Option<String>,

    #[arg(long, env = "RELAY_TLS_KEY", requires = "tls_cert")]
    pub tls_key: Option<String>,
}

/// Process-wide relay settings, fixed at startup
#[derive(Clone)]
pub struct RelayConfig {
    pub client_id: String,
    pub client_secret: String,
    pub oauth_host: Url,
    pub public_url: Option<Url>,
    pub verify_state: bool,
    pub upstream_timeout_secs: u64,
    /// Scheme assumed when a request doesn't say how it reached us
    pub default_scheme: &'static str,
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("oauth_host", &self.oauth_host.as_str())
            .field("public_url", &self.public_url.as_ref().map(Url::as_str))
            .field("verify_state", &self.verify_state)
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("default_scheme", &self.default_scheme)
            .finish()
    }
}

impl From<&CliOpts> for RelayConfig {
    fn from(cli: &CliOpts) -> Self {
        let default_scheme = match cli.tls_cert.is_some() && cli.tls_key.is_some() {
            true => "https",
            false => "http",
        };
        Self {
            client_id: cli.client_id.clone(),
            client_secret: cli.client_secret.clone(),
            oauth_host: cli.oauth_host.clone(),
            public_url: cli.public_url.clone(),
            verify_state: cli.verify_state,
            upstream_timeout_secs: cli.upstream_timeout_secs,
            default_scheme,
        }
    }
}

impl RelayConfig {
    #[cfg(test)]
    pub(crate) fn new_test(oauth_host: &str) -> Self {
        Self {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            oauth_host: Url::parse(oauth_host).expect("Invalid test oauth host"),
            public_url: None,
            verify_state: false,
            upstream_timeout_secs: 5,
            default_scheme: "http",
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub oauth_client: Arc<GitHubOAuthClient>,
}

impl AppState {
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        let oauth_client = GitHubOAuthClient::new(&config)?;
        Ok(Self {
            config: Arc::new(config),
            oauth_client: Arc::new(oauth_client),
        })
    }
}

pub async fn start_server(cli: CliOpts) -> Result<(), RelayError> {
    use axum_server::tls_rustls::RustlsConfig;

    let config = RelayConfig::from(&cli);
    info!(config = ?config, "Relay configuration loaded");

    let shared_state = AppState::new(config).inspect_err(|err| {
        error!("Failed to initialize application: {:?}", err);
    })?;
    let app = build_app(shared_state);

    let addr: SocketAddr = cli.listener_addr.parse().map_err(|err| {
        error!("Invalid listener address {}: {:?}", cli.listener_addr, err);
        RelayError::Other(format!("Invalid listener address: {}", err))
    })?;

    let served = match (cli.tls_cert.as_deref(), cli.tls_key.as_deref()) {
        (Some(tls_cert_path), Some(tls_key_path)) => {
            let tls_config = RustlsConfig::from_pem_file(tls_cert_path, tls_key_path)
                .await
                .map_err(|err| {
                    error!(
                        "Failed to load TLS certificates (cert={}, key={}): {:?}",
                        tls_cert_path, tls_key_path, err
                    );
                    RelayError::Other(format!("Failed to load TLS certificates: {}", err))
                })?;
            info!("Starting HTTPS server on https://{}", addr);
            axum_server::bind_rustls(addr, tls_config)
                .serve(app.into_make_service())
                .await
        }
        _ => {
            info!("Starting HTTP server on http://{}", addr);
            axum_server::bind(addr).serve(app.into_make_service()).await
        }
    };

    served.map_err(|err| {
        error!("Server error: {:?}", err);
        RelayError::Other(format!("Server error: {}", err))
    })
}
