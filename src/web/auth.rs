use axum::response::{IntoResponse, Response};
use http::header;
use url::form_urlencoded;

use super::handshake::AuthorizePage;
use super::prelude::*;
use super::request_origin;
use super::state::{new_state_token, remember_state, validate_state};
use crate::constants::Urls;
use crate::oauth::TokenExchange;

/// First value of `name` in the query string, treating an empty value as absent
fn query_param(uri: &Uri, name: &str) -> Option<String> {
    form_urlencoded::parse(uri.query()?.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

// ========== Auth Handlers ==========

#[instrument(level = "info", skip_all)]
pub(crate) async fn auth(
    State(state): State<AppState>,
    session: Session,
    uri: Uri,
    headers: HeaderMap,
) -> Result<Response, RelayError> {
    let origin = request_origin(&state.config, &uri, &headers)?;
    let redirect_uri = format!("{}{}", origin, Urls::Callback.as_str());

    let oauth_state = new_state_token();
    if state.config.verify_state {
        remember_state(&session, &oauth_state).await?;
    }

    let auth_url = state.oauth_client.authorize_url(&redirect_uri, &oauth_state);
    debug!(redirect_uri = %redirect_uri, "Redirecting to OAuth provider");

    // 302 rather than axum's 303, and no CORS headers
    Ok((StatusCode::FOUND, [(header::LOCATION, auth_url.to_string())]).into_response())
}

#[instrument(level = "info", skip_all)]
pub(crate) async fn callback(
    State(state): State<AppState>,
    session: Session,
    uri: Uri,
) -> Result<Response, RelayError> {
    let code = query_param(&uri, "code").ok_or(RelayError::MissingCode)?;

    if state.config.verify_state {
        validate_state(&session, query_param(&uri, "state").as_deref()).await?;
    }

    match state.oauth_client.exchange_code(&code).await? {
        TokenExchange::Success { token, provider } => {
            debug!(provider = %provider, "OAuth2 code exchange successful");
            let page = AuthorizePage::new(&token, &provider)?;
            Ok(HtmlTemplate(page).into_response())
        }
        failure @ TokenExchange::Failure { .. } => {
            let message = failure.failure_message().unwrap_or_default().to_string();
            Err(RelayError::Upstream(message))
        }
    }
}
