//! Logging setup for the relay
//!

use tower_http::trace::{MakeSpan, OnResponse};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::RelayError;

// Initialize tracing subscriber
pub fn setup_logging() -> Result<(), RelayError> {
    let log_level = std::env::var("RUST_LOG")
        .unwrap_or("info".to_string())
        .to_lowercase();
    let log_level_tower_http = std::env::var("RUST_LOG_TOWER_HTTP").unwrap_or(log_level.clone());

    let format_layer = tracing_subscriber::fmt::layer()
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_target(log_level == "debug" || log_level == "trace")
        .with_level(true)
        .with_ansi(false)
        .compact();
    let filter_layer = tracing_subscriber::EnvFilter::builder()
        .parse(format!(
            "decap_oauth_relay={log_level},tower_http={log_level_tower_http},tower_sessions=warn,h2=warn,hyper=warn",
        ))
        .map_err(|err| RelayError::Other(format!("Invalid log filter: {}", err)))?;

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(format_layer)
        .try_init()
        .map_err(|err| RelayError::Other(format!("Failed to install subscriber: {}", err)))?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn setup_test_logging() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_test_writer()
                .with_level(true),
        )
        .with(tracing_subscriber::EnvFilter::new(
            "debug,hyper=info,hyper_util=info,reqwest=info,wiremock=info,h2::codec=warn",
        ))
        .try_init();
}

#[derive(Clone)]
pub(crate) struct HttpLogger {}

impl<B> MakeSpan<B> for HttpLogger {
    fn make_span(&mut self, request: &http::Request<B>) -> tracing::Span {
        // path only, the callback query carries the one-time code
        tracing::info_span!(
            "",
            http.method = %request.method(),
            http.uri = %request.uri().path(),
            http.status_code = tracing::field::Empty,
            http.response_latency_ms = tracing::field::Empty,
        )
    }
}

impl<B> OnResponse<B> for HttpLogger {
    fn on_response(
        self,
        response: &http::Response<B>,
        latency: std::time::Duration,
        span: &tracing::Span,
    ) {
        let status = response.status();
        span.record("http.status_code", status.as_u16());
        span.record("http.response_latency_ms", latency.as_millis());

        tracing::info!(
            http.status_code = status.as_u16(),
            http.response_latency_ms = latency.as_millis(),
        );
    }
}
