//! Proxy subsystem.
//!
//! # Data Flow
//! ```text
//! Request (from the pipeline, after static/robots deferred)
//!     → resolver.rs (base target + routing cookies → ProxyResolution)
//!     → forwarder.rs (header rewrites, reqwest transport, upgrades)
//!     → Response, or a 500 describing the transport failure
//! ```
//!
//! # Design Decisions
//! - The proxy interceptor is terminal: it always answers
//! - Transport failures are reported to the client, never retried

pub mod forwarder;
pub mod resolver;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use std::error::Error as _;
use thiserror::Error;

use crate::config::ProxySettings;
use crate::pipeline::{Interceptor, Outcome, PipelineError};

pub use forwarder::Forwarder;
pub use resolver::{resolve, ProxyResolution};

/// Prefix of the body sent when the upstream cannot be reached.
pub const PROXY_ERROR_PREFIX: &str = "Something went wrong. And we are reporting a custom error message: ";

/// Failure while forwarding to the upstream.
#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("{}", describe(.0))]
    Upstream(#[from] reqwest::Error),

    #[error("invalid upstream response: {0}")]
    Response(#[from] axum::http::Error),
}

/// Render an error with its sources, so the client sees the root cause.
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain")],
            format!("{PROXY_ERROR_PREFIX}{self}"),
        )
            .into_response()
    }
}

/// Terminal interceptor forwarding to the resolved upstream.
pub struct ProxyInterceptor {
    settings: ProxySettings,
    forwarder: Forwarder,
}

impl ProxyInterceptor {
    pub fn new(settings: ProxySettings) -> Result<Self, reqwest::Error> {
        Ok(Self {
            settings,
            forwarder: Forwarder::new()?,
        })
    }

    /// Resolve the upstream for a request without forwarding it.
    pub fn resolve(&self, req: &Request<Body>) -> ProxyResolution {
        let cookies: Vec<&str> = req
            .headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .collect();
        let cookie_header = (!cookies.is_empty()).then(|| cookies.join("; "));
        resolve(&self.settings, req.uri().path(), cookie_header.as_deref())
    }
}

#[async_trait]
impl Interceptor for ProxyInterceptor {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn intercept(&self, req: Request<Body>) -> Result<Outcome, PipelineError> {
        let resolution = self.resolve(&req);
        tracing::debug!(
            path = %req.uri().path(),
            target = %resolution.target,
            host = ?resolution.host_override,
            "Proxy target resolved"
        );

        let response = match self.forwarder.forward(req, &resolution).await {
            Ok(response) => response,
            Err(error) => {
                tracing::warn!(target = %resolution.target, error = %error, "Upstream request failed");
                error.into_response()
            }
        };
        Ok(Outcome::Handled(response))
    }
}
