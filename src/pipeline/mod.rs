//! Request interceptor pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → caller-supplied interceptors (before)
//!     → logging.rs (log hook, always defers)
//!     → cors.rs (preflight answers)          [if cors]
//!     → robots.rs (/robots.txt)              [if robots]
//!     → static_files.rs (ServeDir adapter)   [if root]
//!     → proxy interceptor                    [if proxy]
//!     → 404 when every interceptor deferred
//! ```
//!
//! # Design Decisions
//! - Each interceptor owns the request while it runs and hands it back on defer
//! - Order is fixed when the pipeline is built
//! - An interceptor error terminates the response; it never reaches the listener

pub mod cors;
pub mod listing;
pub mod logging;
pub mod robots;
pub mod static_files;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, Uri, Version},
    response::{IntoResponse, Response},
};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::config::{ConfigError, Settings};
use crate::http::headers::seed_headers;
use crate::proxy::ProxyInterceptor;

pub use cors::CorsInterceptor;
pub use logging::LoggingInterceptor;
pub use robots::RobotsInterceptor;
pub use static_files::StaticInterceptor;

/// Boxed error for caller-supplied interceptors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of a single interceptor attempt.
pub enum Outcome {
    /// The interceptor produced the response; the chain stops.
    Handled(Response),
    /// The interceptor passed; the next one gets the request back.
    Defer(Request<Body>),
}

impl fmt::Debug for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Handled(res) => f.debug_tuple("Handled").field(&res.status()).finish(),
            Outcome::Defer(req) => f.debug_tuple("Defer").field(req.uri()).finish(),
        }
    }
}

/// Failure raised by an interceptor.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("static file engine failed: {0}")]
    Static(#[from] std::io::Error),

    #[error("invalid response: {0}")]
    Response(#[from] axum::http::Error),

    #[error("{0}")]
    Interceptor(#[from] BoxError),
}

/// A unit of request handling that either answers or defers.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn intercept(&self, req: Request<Body>) -> Result<Outcome, PipelineError>;
}

/// The parts of a request kept for logging after the request itself moved on.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestHead {
    pub fn from_request(req: &Request<Body>) -> Self {
        Self {
            method: req.method().clone(),
            uri: req.uri().clone(),
            version: req.version(),
            headers: req.headers().clone(),
        }
    }
}

/// Caller-supplied logging capability, invoked for every request and every
/// pipeline error.
pub trait LogHook: Send + Sync {
    fn log(&self, req: &RequestHead, error: Option<&PipelineError>);
}

impl<F> LogHook for F
where
    F: Fn(&RequestHead, Option<&PipelineError>) + Send + Sync,
{
    fn log(&self, req: &RequestHead, error: Option<&PipelineError>) {
        self(req, error)
    }
}

/// Ordered interceptors plus the headers seeded on every response.
pub struct Pipeline {
    interceptors: Vec<Arc<dyn Interceptor>>,
    headers: HeaderMap,
    log_hook: Option<Arc<dyn LogHook>>,
}

impl Pipeline {
    /// Assemble the built-in interceptors after the caller-supplied ones.
    pub fn build(
        settings: &Settings,
        before: Vec<Arc<dyn Interceptor>>,
        log_hook: Option<Arc<dyn LogHook>>,
    ) -> Result<Self, ConfigError> {
        let mut interceptors = before;

        interceptors.push(Arc::new(LoggingInterceptor::new(log_hook.clone())));

        if let Some(cors) = &settings.cors {
            interceptors.push(Arc::new(CorsInterceptor::new(cors)));
        }
        if let Some(policy) = &settings.robots {
            interceptors.push(Arc::new(RobotsInterceptor::new(policy)));
        }
        if let Some(static_settings) = &settings.static_files {
            interceptors.push(Arc::new(StaticInterceptor::new(static_settings.clone())));
        }
        if let Some(proxy_settings) = &settings.proxy {
            interceptors.push(Arc::new(ProxyInterceptor::new(proxy_settings.clone())?));
        }

        tracing::debug!(
            interceptors = ?interceptors.iter().map(|i| i.name()).collect::<Vec<_>>(),
            "Pipeline assembled"
        );

        Ok(Self {
            interceptors,
            headers: settings.headers.clone(),
            log_hook,
        })
    }

    /// Names of the installed interceptors, in order.
    pub fn interceptor_names(&self) -> Vec<&'static str> {
        self.interceptors.iter().map(|i| i.name()).collect()
    }

    /// Run the interceptors against one request; exactly one response results.
    pub async fn dispatch(&self, req: Request<Body>) -> Response {
        let head = self.log_hook.as_ref().map(|_| RequestHead::from_request(&req));
        let mut req = req;

        let mut response = 'chain: {
            for interceptor in &self.interceptors {
                match interceptor.intercept(req).await {
                    Ok(Outcome::Handled(response)) => break 'chain response,
                    Ok(Outcome::Defer(next)) => req = next,
                    Err(error) => {
                        tracing::error!(interceptor = interceptor.name(), error = %error, "Interceptor failed");
                        if let (Some(hook), Some(head)) = (&self.log_hook, &head) {
                            hook.log(head, Some(&error));
                        }
                        break 'chain StatusCode::INTERNAL_SERVER_ERROR.into_response();
                    }
                }
            }
            StatusCode::NOT_FOUND.into_response()
        };

        seed_headers(response.headers_mut(), &self.headers);
        response
    }
}
