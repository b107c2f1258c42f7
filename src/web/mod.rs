pub(crate) mod auth;
pub(crate) mod handshake;
pub(crate) mod prelude;
pub(crate) mod state;

use axum::extract::Request;
use axum::middleware::{from_fn, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use http::{header, Method};
use time::Duration;
use tower_http::trace::TraceLayer;
use tower_sessions::cookie::SameSite;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::constants::{Urls, SERVICE_BANNER};
use crate::RelayConfig;
use prelude::*;

pub fn build_app(shared_state: AppState) -> Router {
    let secure_cookies = match shared_state.config.public_url.as_ref() {
        Some(public_url) => public_url.scheme() == "https",
        None => shared_state.config.default_scheme == "https",
    };
    // Only touched when state verification is on. Lax so the cookie survives
    // the provider's cross-site redirect back to /callback.
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(secure_cookies)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(Duration::minutes(10)));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(crate::logging::HttpLogger {})
        .on_response(crate::logging::HttpLogger {});

    Router::new()
        .route(Urls::Auth.as_ref(), any(auth::auth))
        .route(Urls::Callback.as_ref(), any(auth::callback))
        .fallback(banner)
        .layer(session_layer)
        .layer(from_fn(preflight))
        .layer(trace_layer)
        .with_state(shared_state)
}

/// Answer `OPTIONS` on any path before routing
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return (StatusCode::NO_CONTENT, CORS_HEADERS).into_response();
    }
    next.run(request).await
}

#[instrument(level = "info", skip_all)]
async fn banner() -> impl IntoResponse {
    (CORS_HEADERS, SERVICE_BANNER)
}

/// Scheme, host and port this request was addressed to, e.g. `https://relay.example.com`
pub(crate) fn request_origin(
    config: &RelayConfig,
    uri: &Uri,
    headers: &HeaderMap,
) -> Result<String, RelayError> {
    if let Some(public_url) = config.public_url.as_ref() {
        return Ok(public_url.origin().ascii_serialization());
    }

    if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
        return Ok(format!("{scheme}://{authority}"));
    }

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(RelayError::MissingOrigin)?;
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| *value == "http" || *value == "https")
        .unwrap_or(config.default_scheme);

    Ok(format!("{scheme}://{host}"))
}
