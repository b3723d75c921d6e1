//! CORS preflight interceptor.
//!
//! The allow-list itself is computed once in `http::headers` and seeded on
//! every response; this interceptor only answers preflight requests.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::headers::{CorsHeaders, CORS_ALLOW_METHODS};
use crate::pipeline::{Interceptor, Outcome, PipelineError};

pub struct CorsInterceptor {
    allow_headers: String,
}

impl CorsInterceptor {
    pub fn new(cors: &CorsHeaders) -> Self {
        Self {
            allow_headers: cors.allow_headers(),
        }
    }

    fn is_preflight(req: &Request<Body>) -> bool {
        req.method() == Method::OPTIONS
            && req.headers().contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
    }

    fn preflight_response(&self) -> Response {
        let mut res = StatusCode::NO_CONTENT.into_response();
        let headers = res.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(CORS_ALLOW_METHODS),
        );
        if let Ok(value) = HeaderValue::from_str(&self.allow_headers) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        res
    }
}

#[async_trait]
impl Interceptor for CorsInterceptor {
    fn name(&self) -> &'static str {
        "cors"
    }

    async fn intercept(&self, req: Request<Body>) -> Result<Outcome, PipelineError> {
        if Self::is_preflight(&req) {
            tracing::debug!(path = %req.uri().path(), "Answering CORS preflight");
            return Ok(Outcome::Handled(self.preflight_response()));
        }
        Ok(Outcome::Defer(req))
    }
}
