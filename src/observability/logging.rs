//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Provide the default per-request log hook
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Log level configurable via config and environment

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::http::RequestIdExt;
use crate::pipeline::{LogHook, PipelineError, RequestHead};

/// Install the global subscriber. Safe to call more than once; later calls
/// are no-ops.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new(LogConfig::default().level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}

/// Log hook writing one event per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogHook;

impl LogHook for TracingLogHook {
    fn log(&self, req: &RequestHead, error: Option<&PipelineError>) {
        let request_id = req.request_id().unwrap_or("-");
        let user_agent = req
            .headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        match error {
            Some(error) => tracing::error!(
                request_id,
                method = %req.method,
                uri = %req.uri,
                error = %error,
                "Request failed"
            ),
            None => tracing::info!(
                request_id,
                method = %req.method,
                uri = %req.uri,
                user_agent,
                "Request"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    #[test]
    fn init_twice_is_harmless() {
        let config = LogConfig::default();
        init_tracing(&config);
        init_tracing(&config);
    }

    #[test]
    fn hook_accepts_requests_with_and_without_errors() {
        let req = Request::builder()
            .uri("/x")
            .header("x-request-id", "abc")
            .body(Body::empty())
            .unwrap();
        let head = RequestHead::from_request(&req);
        TracingLogHook.log(&head, None);

        let error = PipelineError::Interceptor("boom".into());
        TracingLogHook.log(&head, Some(&error));
    }
}
