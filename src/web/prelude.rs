use askama::Template;
use axum::response::{Html, IntoResponse, Response};
pub(crate) use axum::extract::State;
pub(crate) use http::{HeaderMap, StatusCode, Uri};
pub(crate) use tower_sessions::Session;
pub(crate) use tracing::*;

pub(crate) use crate::constants::CORS_HEADERS;
pub(crate) use crate::error::RelayError;
pub(crate) use crate::AppState;

// Askama template wrapper for HTML responses
pub(crate) struct HtmlTemplate<T>(pub(crate) T);

impl<T> IntoResponse for HtmlTemplate<T>
where
    T: Template,
{
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => (CORS_HEADERS, Html(html)).into_response(),
            Err(err) => RelayError::Render(err).into_response(),
        }
    }
}
