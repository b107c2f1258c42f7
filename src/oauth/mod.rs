//! GitHub OAuth2 authorization-code client
//!
//! Only the two legs the relay needs: building the authorize URL and trading a
//! code for an access token. Tokens are handed straight to the caller and never
//! stored.

use std::time::Duration;

use reqwest::{header, redirect, Client};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::constants::{OAUTH_AUTHORIZE_PATH, OAUTH_PROVIDER, OAUTH_SCOPES, OAUTH_TOKEN_PATH};
use crate::error::RelayError;
use crate::RelayConfig;

/// Body POSTed to the provider's token endpoint
#[derive(Serialize)]
pub struct TokenRequest<'a> {
    pub client_id: &'a str,
    pub client_secret: &'a str,
    pub code: &'a str,
}

/// The token endpoint's JSON as sent; GitHub answers `200` for both outcomes
#[derive(Debug, Default, Deserialize)]
pub struct RawTokenResponse {
    pub access_token: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// Outcome of a token exchange
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenExchange {
    Success {
        token: String,
        provider: String,
    },
    Failure {
        code: String,
        description: Option<String>,
    },
}

impl TokenExchange {
    /// Text shown to the user for a failed exchange, preferring a non-empty description
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            TokenExchange::Success { .. } => None,
            TokenExchange::Failure { code, description } => Some(
                description
                    .as_deref()
                    .filter(|description| !description.is_empty())
                    .unwrap_or(code.as_str()),
            ),
        }
    }
}

impl TryFrom<RawTokenResponse> for TokenExchange {
    type Error = RelayError;

    fn try_from(raw: RawTokenResponse) -> Result<Self, Self::Error> {
        // a non-empty error field wins even if a token came along with it
        if let Some(code) = raw.error.filter(|code| !code.is_empty()) {
            return Ok(TokenExchange::Failure {
                code,
                description: raw.error_description,
            });
        }
        match raw.access_token.filter(|token| !token.is_empty()) {
            Some(token) => Ok(TokenExchange::Success {
                token,
                provider: OAUTH_PROVIDER.to_string(),
            }),
            None => Err(RelayError::MissingAccessToken),
        }
    }
}

pub struct GitHubOAuthClient {
    client_id: String,
    client_secret: String,
    authorize_url: Url,
    token_url: Url,
    http_client: Client,
}

impl GitHubOAuthClient {
    pub fn new(config: &RelayConfig) -> Result<Self, RelayError> {
        let http_client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(config.upstream_timeout_secs))
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|err| {
                error!("Failed to build HTTP client: {:?}", err);
                RelayError::Http(err)
            })?;

        Ok(Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            authorize_url: config.oauth_host.join(OAUTH_AUTHORIZE_PATH)?,
            token_url: config.oauth_host.join(OAUTH_TOKEN_PATH)?,
            http_client,
        })
    }

    /// Build the provider URL the browser is sent to
    pub fn authorize_url(&self, redirect_uri: &str, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", OAUTH_SCOPES)
            .append_pair("state", state);
        url
    }

    /// Trade an authorization code for an access token
    pub async fn exchange_code(&self, code: &str) -> Result<TokenExchange, RelayError> {
        debug!(token_url = %self.token_url, "Exchanging authorization code");

        let response = self
            .http_client
            .post(self.token_url.clone())
            .header(header::ACCEPT, "application/json")
            .json(&TokenRequest {
                client_id: &self.client_id,
                client_secret: &self.client_secret,
                code,
            })
            .send()
            .await?;

        debug!(status = %response.status(), "Token endpoint responded");

        let raw: RawTokenResponse = response.json().await?;
        TokenExchange::try_from(raw)
    }
}
