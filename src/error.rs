use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;
use tracing::{error, warn};

use crate::constants::CORS_HEADERS;

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Missing code parameter")]
    MissingCode,
    #[error("Unable to determine the origin of this request")]
    MissingOrigin,
    #[error("Invalid state parameter")]
    InvalidState,
    /// The provider answered the token exchange with an `error` field
    #[error("OAuth Error: {0}")]
    Upstream(String),
    #[error("Error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Error: token response did not contain an access_token")]
    MissingAccessToken,
    #[error("Error: {0}")]
    Session(#[from] tower_sessions::session::Error),
    #[error("Error: failed to render template: {0}")]
    Render(#[from] askama::Error),
    #[error("Error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("Error: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Error: {0}")]
    Other(String),
}

impl RelayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::MissingCode | RelayError::MissingOrigin | RelayError::Upstream(_) => {
                StatusCode::BAD_REQUEST
            }
            RelayError::InvalidState => StatusCode::FORBIDDEN,
            RelayError::Http(_)
            | RelayError::MissingAccessToken
            | RelayError::Session(_)
            | RelayError::Render(_)
            | RelayError::Serialize(_)
            | RelayError::InvalidUrl(_)
            | RelayError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = ?self, "request failed");
        } else {
            warn!(error = %self, "request rejected");
        }
        (status, CORS_HEADERS, self.to_string()).into_response()
    }
}
